//! Message catalog
//!
//! Maps an error code plus positional arguments to text in the caller's
//! locale. Only used to render messages, never to decide control flow.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

/// Source of message templates. Templates use `{0}`, `{1}`... placeholders.
pub trait MessageCatalog: Send + Sync {
    fn template(&self, locale: &str, code: &str) -> Option<&str>;
}

const EN: &[(&str, &str)] = &[
    ("beneficiary.invalid_id", "Invalid beneficiary id: {0}"),
    ("beneficiary.not_found", "Beneficiary {0} does not exist"),
    ("beneficiary.name.blank", "Name must not be blank"),
    ("beneficiary.name.too_long", "Name must be at most 100 characters"),
    ("beneficiary.phone.blank", "Phone number must not be blank"),
    ("beneficiary.phone.pattern", "Phone number must have 10 to 15 digits"),
    ("beneficiary.not_an_image", "The file must be an image"),
    ("beneficiary.image_not_found", "Beneficiary {0} has no image"),
    ("beneficiary.has_dependents", "Beneficiary {0} still has loans"),
    ("loan.invalid_id", "Invalid loan id: {0}"),
    ("loan.not_found", "Loan {0} does not exist"),
    ("loan.principal.positive", "Loan amount must be positive"),
    ("loan.percentage.positive_or_zero", "Percentage must be zero or positive"),
    ("loan.has_dependents", "Loan {0} still has payments"),
    ("payment.invalid_id", "Invalid payment id: {0}"),
    ("payment.not_found", "Payment {0} does not exist"),
    ("payment.amount.positive", "Amount paid must be positive"),
    ("payment.type.invalid", "Invalid payment type: {0}"),
    ("amount.invalid", "Invalid amount: {0}"),
    ("date.invalid", "Invalid date: {0}"),
    ("month.invalid", "Invalid month: {0}-{1}"),
    ("auth.invalid_credentials", "Invalid login or password"),
    ("auth.invalid_token", "Invalid or expired token"),
];

const PT_BR: &[(&str, &str)] = &[
    ("beneficiary.invalid_id", "Id de beneficiário inválido: {0}"),
    ("beneficiary.not_found", "Beneficiário {0} não existe"),
    ("beneficiary.name.blank", "O nome não pode ser vazio"),
    ("beneficiary.name.too_long", "O nome deve ter no máximo 100 caracteres"),
    ("beneficiary.phone.blank", "O número de telefone não pode ser vazio"),
    ("beneficiary.phone.pattern", "O número de telefone deve ter de 10 a 15 dígitos"),
    ("beneficiary.not_an_image", "O arquivo deve ser uma imagem"),
    ("beneficiary.image_not_found", "Beneficiário {0} não possui imagem"),
    ("beneficiary.has_dependents", "Beneficiário {0} ainda possui empréstimos"),
    ("loan.invalid_id", "Id de empréstimo inválido: {0}"),
    ("loan.not_found", "Empréstimo {0} não existe"),
    ("loan.principal.positive", "O valor do empréstimo deve ser positivo"),
    ("loan.percentage.positive_or_zero", "A porcentagem deve ser zero ou positiva"),
    ("loan.has_dependents", "Empréstimo {0} ainda possui pagamentos"),
    ("payment.invalid_id", "Id de pagamento inválido: {0}"),
    ("payment.not_found", "Pagamento {0} não existe"),
    ("payment.amount.positive", "O valor pago deve ser positivo"),
    ("payment.type.invalid", "Tipo de pagamento inválido: {0}"),
    ("amount.invalid", "Valor inválido: {0}"),
    ("date.invalid", "Data inválida: {0}"),
    ("month.invalid", "Mês inválido: {0}-{1}"),
    ("auth.invalid_credentials", "Login/Senha inválidos!"),
    ("auth.invalid_token", "Token inválido ou expirado"),
];

/// Catalog compiled into the binary, `en` and `pt-BR`
#[derive(Debug, Clone)]
pub struct BundledCatalog {
    bundles: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl BundledCatalog {
    pub fn new() -> Self {
        let bundles: HashMap<_, HashMap<_, _>> = [("en", EN), ("pt-BR", PT_BR)]
            .into_iter()
            .map(|(locale, entries)| (locale, entries.iter().copied().collect()))
            .collect();
        Self { bundles }
    }

    pub fn supports(&self, locale: &str) -> bool {
        self.bundles.contains_key(locale)
    }
}

impl Default for BundledCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageCatalog for BundledCatalog {
    fn template(&self, locale: &str, code: &str) -> Option<&str> {
        self.bundles.get(locale)?.get(code).copied()
    }
}

/// Cloneable rendering handle injected into the managers
#[derive(Clone)]
pub struct Messages {
    catalog: Arc<dyn MessageCatalog>,
    default_locale: String,
}

impl Messages {
    pub fn new(catalog: Arc<dyn MessageCatalog>, default_locale: impl Into<String>) -> Self {
        Self {
            catalog,
            default_locale: default_locale.into(),
        }
    }

    /// Bundled catalog with the given default locale
    pub fn bundled(default_locale: impl Into<String>) -> Self {
        Self::new(Arc::new(BundledCatalog::new()), default_locale)
    }

    /// Render `code` for `locale`, falling back to its primary language
    /// subtag, the default locale and then the code itself.
    pub fn render(&self, locale: Option<&str>, code: &str, args: &[&dyn Display]) -> String {
        let template = locale
            .and_then(|locale| {
                self.catalog.template(locale, code).or_else(|| {
                    let language = locale.split('-').next()?;
                    self.catalog.template(language, code)
                })
            })
            .or_else(|| self.catalog.template(&self.default_locale, code))
            .unwrap_or(code);

        args.iter()
            .enumerate()
            .fold(template.to_string(), |text, (index, arg)| {
                text.replace(&format!("{{{index}}}"), &arg.to_string())
            })
    }
}

impl std::fmt::Debug for Messages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messages")
            .field("default_locale", &self.default_locale)
            .finish_non_exhaustive()
    }
}

/// First language tag of an `Accept-Language` value, e.g. `pt-BR` from
/// `pt-BR,pt;q=0.9,en;q=0.8`
pub fn preferred_locale(accept_language: &str) -> Option<String> {
    accept_language
        .split(',')
        .map(|part| part.split(';').next().unwrap_or("").trim())
        .find(|tag| !tag.is_empty() && *tag != "*")
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_args() {
        let messages = Messages::bundled("en");
        let text = messages.render(None, "loan.not_found", &[&42]);
        assert_eq!(text, "Loan 42 does not exist");
    }

    #[test]
    fn test_render_caller_locale() {
        let messages = Messages::bundled("en");
        let text = messages.render(Some("pt-BR"), "beneficiary.invalid_id", &[&"abc"]);
        assert_eq!(text, "Id de beneficiário inválido: abc");
    }

    #[test]
    fn test_unknown_locale_falls_back_to_default() {
        let messages = Messages::bundled("pt-BR");
        let text = messages.render(Some("fr"), "month.invalid", &[&2024, &13]);
        assert_eq!(text, "Mês inválido: 2024-13");
    }

    #[test]
    fn test_region_falls_back_to_language() {
        let messages = Messages::bundled("pt-BR");
        let text = messages.render(Some("en-US"), "loan.not_found", &[&3]);
        assert_eq!(text, "Loan 3 does not exist");
    }

    #[test]
    fn test_unknown_code_renders_code() {
        let messages = Messages::bundled("en");
        assert_eq!(messages.render(None, "no.such.code", &[]), "no.such.code");
    }

    #[test]
    fn test_injected_catalog() {
        struct Fixed;
        impl MessageCatalog for Fixed {
            fn template(&self, _locale: &str, _code: &str) -> Option<&str> {
                Some("fixed {0}")
            }
        }

        let messages = Messages::new(Arc::new(Fixed), "xx");
        assert_eq!(messages.render(None, "anything", &[&"text"]), "fixed text");
    }

    #[test]
    fn test_preferred_locale() {
        assert_eq!(preferred_locale("pt-BR,pt;q=0.9,en;q=0.8").as_deref(), Some("pt-BR"));
        assert_eq!(preferred_locale("en;q=0.5").as_deref(), Some("en"));
        assert_eq!(preferred_locale("*"), None);
        assert_eq!(preferred_locale(""), None);
    }

    #[test]
    fn test_bundles_have_same_codes() {
        let catalog = BundledCatalog::new();
        for (code, _) in EN {
            assert!(catalog.template("pt-BR", code).is_some(), "pt-BR misses {code}");
        }
        assert!(catalog.supports("en"));
        assert!(!catalog.supports("de"));
    }
}
