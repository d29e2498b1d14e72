use crate::domain::entities::TranslationRecord;
use crate::domain::types::Locale;

/// Pick the display name for `locale`, falling back to `default` when the
/// entry has no translation for it.
pub fn localized_name<'a>(
    translations: &'a [TranslationRecord],
    locale: Locale,
    default: &'a str,
) -> &'a str {
    translations
        .iter()
        .find(|translation| translation.locale == locale)
        .map(|translation| translation.name.as_str())
        .unwrap_or(default)
}
