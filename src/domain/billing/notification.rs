//! Notification templates for billing mail.
//!
//! Templates render to a transport-neutral [`EmailMessage`]; the sender
//! adapter decides how it goes out. Customer mail is localized per
//! [`super::locale::language_for_currency`]; ops mail is English only.

use super::locale::Language;

/// A rendered, ready-to-send email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Confirmation mail after a successful subscription payment.
pub fn payment_succeeded_email(lang: Language, to: &str, amount: &str) -> EmailMessage {
    let (subject, body) = match lang {
        Language::En => (
            "Payment received".to_string(),
            format!(
                "We received your payment of {amount}. Your subscription is active. \
                 Thank you for subscribing!"
            ),
        ),
        Language::Pt => (
            "Pagamento recebido".to_string(),
            format!(
                "Recebemos seu pagamento de {amount}. Sua assinatura est\u{e1} ativa. \
                 Obrigado por assinar!"
            ),
        ),
    };
    render(to, subject, body)
}

/// Mail sent when a subscription payment fails, asking the customer to
/// update their payment method.
pub fn payment_failed_email(lang: Language, to: &str, amount: &str) -> EmailMessage {
    let (subject, body) = match lang {
        Language::En => (
            "Payment failed".to_string(),
            format!(
                "Your subscription payment of {amount} could not be processed. \
                 Please update your payment method to keep your subscription active."
            ),
        ),
        Language::Pt => (
            "Falha no pagamento".to_string(),
            format!(
                "N\u{e3}o foi poss\u{ed}vel processar o pagamento de {amount} da sua \
                 assinatura. Atualize sua forma de pagamento para manter sua \
                 assinatura ativa."
            ),
        ),
    };
    render(to, subject, body)
}

/// Mail sent when a renewal invoice is paid.
pub fn subscription_renewed_email(lang: Language, to: &str, amount: &str) -> EmailMessage {
    let (subject, body) = match lang {
        Language::En => (
            "Subscription renewed".to_string(),
            format!(
                "Your subscription has renewed and we received your payment of {amount}. \
                 No action is needed."
            ),
        ),
        Language::Pt => (
            "Assinatura renovada".to_string(),
            format!(
                "Sua assinatura foi renovada e recebemos seu pagamento de {amount}. \
                 Nenhuma a\u{e7}\u{e3}o \u{e9} necess\u{e1}ria."
            ),
        ),
    };
    render(to, subject, body)
}

/// Heads-up mail for an upcoming renewal invoice.
pub fn renewal_upcoming_email(lang: Language, to: &str, amount: &str) -> EmailMessage {
    let (subject, body) = match lang {
        Language::En => (
            "Upcoming renewal".to_string(),
            format!(
                "Your subscription will renew soon and {amount} will be charged to \
                 your payment method on file."
            ),
        ),
        Language::Pt => (
            "Renova\u{e7}\u{e3}o em breve".to_string(),
            format!(
                "Sua assinatura ser\u{e1} renovada em breve e {amount} ser\u{e1} \
                 cobrado na sua forma de pagamento cadastrada."
            ),
        ),
    };
    render(to, subject, body)
}

/// Internal audit mail to the ops mailbox summarizing a settled payment.
pub fn ops_payment_summary_email(
    ops_to: &str,
    customer_email: &str,
    amount: &str,
    plan_label: &str,
) -> EmailMessage {
    let subject = format!("Payment settled: {amount} ({plan_label})");
    let body = format!(
        "Customer {customer_email} paid {amount} for plan {plan_label}. \
         Recorded automatically from a provider webhook."
    );
    render(ops_to, subject, body)
}

fn render(to: &str, subject: String, body: String) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        html: format!("<p>{}</p>", body),
        text: body,
        subject,
    }
}
