//! Display-name inflection for resource listings.
//!
//! Used only to fill in label/plural defaults when the platform's schema
//! extras carry no override; never feeds into query construction.

/// Convert a resource name to a plural form using English grammar rules.
pub fn pluralize(name: &str) -> String {
    if name.is_empty() {
        return name.to_string();
    }

    let lower = name.to_lowercase();

    // 'z' gets doubled before the 'es'
    if lower.ends_with('z') && !lower.ends_with("tz") {
        return format!("{}zes", name);
    }
    if lower.ends_with('s')
        || lower.ends_with("sh")
        || lower.ends_with("ch")
        || lower.ends_with('x')
    {
        return format!("{}es", name);
    }

    // consonant + 'y' -> 'ies'
    if lower.ends_with('y') && lower.len() > 1 {
        let second_last = lower.chars().nth(lower.len() - 2).unwrap_or('a');
        if !"aeiou".contains(second_last) {
            return format!("{}ies", &name[..name.len() - 1]);
        }
    }

    if lower.ends_with("fe") {
        return format!("{}ves", &name[..name.len() - 2]);
    }
    if lower.ends_with('f') {
        return format!("{}ves", &name[..name.len() - 1]);
    }

    // consonant + 'o' -> 'es'
    if lower.ends_with('o') && lower.len() > 1 {
        let second_last = lower.chars().nth(lower.len() - 2).unwrap_or('a');
        if !"aeiou".contains(second_last) {
            return format!("{}es", name);
        }
    }

    format!("{}s", name)
}

/// Convert a resource name to a human-readable label: underscore and dot
/// separated segments become capitalized words.
pub fn labelize(name: &str) -> String {
    name.split(['_', '.'])
        .filter(|segment| !segment.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_plurals() {
        assert_eq!(pluralize("Account"), "Accounts");
        assert_eq!(pluralize("Contact"), "Contacts");
        assert_eq!(pluralize("Product"), "Products");
    }

    #[test]
    fn test_sibilant_endings() {
        assert_eq!(pluralize("Address"), "Addresses");
        assert_eq!(pluralize("Branch"), "Branches");
        assert_eq!(pluralize("Box"), "Boxes");
        assert_eq!(pluralize("Quiz"), "Quizzes");
    }

    #[test]
    fn test_y_endings() {
        assert_eq!(pluralize("Opportunity"), "Opportunities");
        assert_eq!(pluralize("Survey"), "Surveys");
    }

    #[test]
    fn test_o_and_f_endings() {
        assert_eq!(pluralize("Hero"), "Heroes");
        assert_eq!(pluralize("Video"), "Videos");
        assert_eq!(pluralize("Leaf"), "Leaves");
        assert_eq!(pluralize("Knife"), "Knives");
    }

    #[test]
    fn test_labelize_custom_objects() {
        assert_eq!(labelize("Account"), "Account");
        assert_eq!(labelize("my_custom_object"), "My Custom Object");
        assert_eq!(labelize("ns.thing"), "Ns Thing");
    }
}
