use std::path::Path;

use stringdex::store::DeleteTarget;
use unic_langid::LanguageIdentifier;

/// Validation context for different command types
#[derive(Debug, Default)]
pub struct ValidationContext {
    pub input_paths: Vec<String>,
    pub input_file: Option<String>,
    pub search_pattern: Option<String>,
    pub language_prefixes: Vec<String>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input_path(mut self, path: String) -> Self {
        self.input_paths.push(path);
        self
    }

    pub fn with_input_file(mut self, file: String) -> Self {
        self.input_file = Some(file);
        self
    }

    pub fn with_search_pattern(mut self, pattern: String) -> Self {
        self.search_pattern = Some(pattern);
        self
    }

    pub fn with_language_prefix(mut self, prefix: String) -> Self {
        self.language_prefixes.push(prefix);
        self
    }
}

/// Validate file path exists and is readable
pub fn validate_file_path(path: &str) -> Result<(), String> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return Err(format!("File does not exist: {}", path));
    }

    if !path_obj.is_file() {
        return Err(format!("Path is not a file: {}", path));
    }

    Ok(())
}

/// Validate a scan root: an existing directory or a single file.
pub fn validate_input_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Path cannot be empty".to_string());
    }
    if !Path::new(path).exists() {
        return Err(format!("Path does not exist: {}", path));
    }
    Ok(())
}

/// Validate a search pattern.
pub fn validate_search_pattern(pattern: &str) -> Result<(), String> {
    if pattern.is_empty() {
        return Err("Search pattern cannot be empty".to_string());
    }
    Ok(())
}

/// Validate a language prefix used to narrow a search.
///
/// Prefixes are matched against `.lproj` directory names, so legacy names
/// such as `German` or partial tags such as `zh_` are accepted as long as they
/// only use tag characters.
pub fn validate_language_prefix(prefix: &str) -> Result<(), String> {
    if prefix.is_empty() {
        return Err("Language prefix cannot be empty".to_string());
    }
    if let Some(c) = prefix
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(format!(
            "Invalid character '{}' in language prefix: {}",
            c, prefix
        ));
    }
    Ok(())
}

/// Whether `prefix` is itself a well-formed BCP 47 identifier.
///
/// `.lproj` names use `_` as the region separator, so it is normalized first.
pub fn is_language_identifier(prefix: &str) -> bool {
    let normalized = prefix.replace('_', "-");
    let normalized = normalized.trim_end_matches('-');
    !normalized.is_empty() && normalized.parse::<LanguageIdentifier>().is_ok()
}

/// Interprets a `delete` argument: all digits is a bundle id, anything else a path.
pub fn parse_delete_target(arg: &str) -> Result<DeleteTarget, String> {
    if arg.is_empty() {
        return Err("Delete target cannot be empty".to_string());
    }
    if arg.chars().all(|c| c.is_ascii_digit()) {
        return arg
            .parse::<i64>()
            .map(DeleteTarget::Id)
            .map_err(|e| format!("Invalid bundle id {}: {}", arg, e));
    }

    let path = Path::new(arg);
    let resolved = match path.canonicalize() {
        Ok(canonical) => canonical,
        Err(_) if path.is_absolute() => path.to_path_buf(),
        Err(_) => std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .map_err(|e| format!("Cannot resolve path {}: {}", arg, e))?,
    };
    Ok(DeleteTarget::Path(resolved))
}

/// Validate a complete validation context
pub fn validate_context(context: &ValidationContext) -> Result<(), String> {
    for (i, input) in context.input_paths.iter().enumerate() {
        validate_input_path(input)
            .map_err(|e| format!("Input path {} validation failed: {}", i + 1, e))?;
    }

    if let Some(ref file) = context.input_file {
        validate_file_path(file).map_err(|e| format!("Input file validation failed: {}", e))?;
    }

    if let Some(ref pattern) = context.search_pattern {
        validate_search_pattern(pattern)?;
    }

    for prefix in &context.language_prefixes {
        validate_language_prefix(prefix)
            .map_err(|e| format!("Language prefix validation failed: {}", e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_prefixes() {
        assert!(validate_language_prefix("en").is_ok());
        assert!(validate_language_prefix("Ger").is_ok());
        assert!(validate_language_prefix("zh_").is_ok());
        assert!(validate_language_prefix("").is_err());
        assert!(validate_language_prefix("en%").is_err());
    }

    #[test]
    fn test_is_language_identifier() {
        assert!(is_language_identifier("de"));
        assert!(is_language_identifier("pt_BR"));
        assert!(is_language_identifier("zh_"));
        assert!(!is_language_identifier("e"));
        assert!(!is_language_identifier("_"));
    }

    #[test]
    fn test_parse_delete_target() {
        assert_eq!(parse_delete_target("12"), Ok(DeleteTarget::Id(12)));
        assert!(matches!(
            parse_delete_target("/no/such/Thing.app"),
            Ok(DeleteTarget::Path(p)) if p == Path::new("/no/such/Thing.app")
        ));
        assert!(parse_delete_target("").is_err());
    }
}
