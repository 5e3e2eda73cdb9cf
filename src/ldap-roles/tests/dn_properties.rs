//! Property tests for DN parsing and group extraction

use async_trait::async_trait;
use ldap_roles::{
    DirectoryRecord, DirectorySearch, DistinguishedName, GroupExtractor, RoleResolver,
    SearchRequest, SessionId,
};
use proptest::prelude::*;

struct SingleUserDirectory {
    session: SessionId,
    record: DirectoryRecord,
}

#[async_trait]
impl DirectorySearch for SingleUserDirectory {
    fn session_id(&self) -> SessionId {
        self.session
    }

    async fn find_one(
        &self,
        _request: &SearchRequest,
    ) -> ldap_roles::Result<Option<DirectoryRecord>> {
        Ok(Some(self.record.clone()))
    }
}

/// Escape a value the way directory servers serialize it
fn escape_value(value: &str) -> String {
    let mut escaped = String::new();
    for (i, c) in value.chars().enumerate() {
        let leading_special = i == 0 && (c == ' ' || c == '#');
        let trailing_space = i == value.chars().count() - 1 && c == ' ';
        let special = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=');
        if special || leading_special || trailing_space {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn attr_type() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("cn".to_string()),
        Just("CN".to_string()),
        Just("ou".to_string()),
        Just("dc".to_string()),
        Just("uid".to_string()),
        "[a-zA-Z][a-zA-Z0-9-]{0,8}",
    ]
}

fn attr_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,+=;<>#\"\\\\.-]{1,12}"
}

proptest! {
    #[test]
    fn escaped_values_round_trip(
        rdns in prop::collection::vec((attr_type(), attr_value()), 1..6)
    ) {
        let text = rdns
            .iter()
            .map(|(t, v)| format!("{}={}", t, escape_value(v)))
            .collect::<Vec<_>>()
            .join(",");

        let dn = DistinguishedName::parse(&text).unwrap();

        prop_assert_eq!(dn.len(), rdns.len());
        for (rdn, (t, v)) in dn.rdns().iter().zip(&rdns) {
            prop_assert_eq!(rdn.attr_type(), t.as_str());
            prop_assert_eq!(rdn.value(), v.as_str());
        }

        let expected_cn = rdns
            .iter()
            .rev()
            .find(|(t, _)| t.eq_ignore_ascii_case("cn"))
            .map(|(_, v)| v.as_str());
        prop_assert_eq!(dn.common_name(), expected_cn);
    }

    #[test]
    fn parser_never_panics(input in "\\PC{0,40}") {
        let _ = DistinguishedName::parse(&input);
    }

    #[test]
    fn extraction_keeps_order_and_length(
        groups in prop::collection::vec("[A-Za-z][A-Za-z0-9_]{0,10}", 0..8)
    ) {
        let values: Vec<String> = groups
            .iter()
            .map(|g| format!("cn={},ou=Groups,dc=example,dc=com", g))
            .collect();
        let record = DirectoryRecord::new("uid=u,dc=example,dc=com")
            .with_attribute("memberOf", values);

        let roles = GroupExtractor::default().extract(Some(&record)).unwrap();
        prop_assert_eq!(roles, groups);
    }

    #[test]
    fn cached_lookup_matches_directory_lookup(
        groups in prop::collection::vec("[A-Za-z][A-Za-z0-9_]{0,10}", 1..8)
    ) {
        let values: Vec<String> = groups
            .iter()
            .map(|g| format!("cn={},dc=example,dc=com", g))
            .collect();
        let directory = SingleUserDirectory {
            session: SessionId::new(),
            record: DirectoryRecord::new("uid=u,dc=example,dc=com")
                .with_attribute("memberOf", values),
        };
        let resolver = RoleResolver::new(directory, "dc=example,dc=com");

        let first = tokio_test::block_on(resolver.lookup_roles("u"));
        let second = tokio_test::block_on(resolver.lookup_roles("u"));

        prop_assert!(!first.is_cached());
        prop_assert!(second.is_cached());
        prop_assert_eq!(first.into_roles(), second.into_roles());
    }
}
