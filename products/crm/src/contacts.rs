//! Contact list filtering for the contacts view.

use std::collections::BTreeSet;

use entity::Contact;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactFilter {
    /// Case-insensitive substring over first name, last name, email and company.
    pub search: Option<String>,
    /// Case-insensitive substring over company.
    pub company: Option<String>,
}

impl ContactFilter {
    pub fn matches(&self, contact: &Contact) -> bool {
        if let Some(term) = needle(&self.search) {
            let hit = [
                &contact.first_name,
                &contact.last_name,
                &contact.email,
                &contact.company,
            ]
            .into_iter()
            .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        match needle(&self.company) {
            Some(company) => contact.company.to_lowercase().contains(&company),
            None => true,
        }
    }

    pub fn apply<'a>(&self, contacts: &'a [Contact]) -> Vec<&'a Contact> {
        contacts.iter().filter(|c| self.matches(c)).collect()
    }
}

/// Blank filters match everything.
fn needle(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

/// Distinct company names, sorted, for the company filter options.
pub fn companies(contacts: &[Contact]) -> Vec<String> {
    contacts
        .iter()
        .map(|contact| contact.company.trim())
        .filter(|company| !company.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contact(id: i64, first: &str, last: &str, email: &str, company: &str) -> Contact {
        serde_json::from_value(json!({
            "Id": id, "firstName": first, "lastName": last,
            "email": email, "company": company
        }))
        .unwrap()
    }

    fn book() -> Vec<Contact> {
        vec![
            contact(1, "Ada", "Lovelace", "ada@engines.io", "Analytical Engines"),
            contact(2, "Grace", "Hopper", "grace@navy.mil", "US Navy"),
            contact(3, "Alan", "Turing", "alan@bletchley.uk", "Bletchley Park"),
        ]
    }

    fn search(term: &str) -> ContactFilter {
        ContactFilter {
            search: Some(term.into()),
            company: None,
        }
    }

    fn ids(found: Vec<&Contact>) -> Vec<i64> {
        found.into_iter().map(|c| c.id).collect()
    }

    #[test]
    fn search_spans_names_email_and_company() {
        let contacts = book();
        assert_eq!(ids(search("HOPPER").apply(&contacts)), [2]);
        assert_eq!(ids(search("bletchley").apply(&contacts)), [3]);
        assert_eq!(ids(search("a").apply(&contacts)), [1, 2, 3]);
    }

    #[test]
    fn company_filter_combines_with_search() {
        let contacts = book();
        let filter = ContactFilter {
            search: Some("a".into()),
            company: Some("navy".into()),
        };
        assert_eq!(ids(filter.apply(&contacts)), [2]);
        let blank = ContactFilter {
            search: Some("  ".into()),
            company: Some(String::new()),
        };
        assert_eq!(blank.apply(&contacts).len(), 3);
    }

    #[test]
    fn company_options_are_distinct_and_sorted() {
        let mut contacts = book();
        contacts.push(contact(4, "Kat", "Johnson", "kat@nasa.gov", "US Navy"));
        assert_eq!(
            companies(&contacts),
            ["Analytical Engines", "Bletchley Park", "US Navy"]
        );
    }
}
