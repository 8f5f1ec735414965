#[cfg(test)]
mod portal_rules_tests {
    use siteserver::admin::AdminRole;
    use siteserver::appointments::{review_status, REVIEW_APPROVED, REVIEW_REJECTED};
    use siteserver::drive::LinkAudience;
    use siteserver::security::jwt::{decode_token, issue_token, REALM_ADMIN, REALM_CUSTOMER};
    use siteserver::tickets::{
        is_valid_priority, is_valid_status, status_label, PRIORITY_NORMAL, STATUS_NEW,
    };
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn test_role_hierarchy_is_numeric_and_total() {
        use AdminRole::{Admin, Staff, Technician};

        // Every role passes its own gate and every gate below it.
        for (current, required, expected) in [
            (Admin, Admin, true),
            (Admin, Staff, true),
            (Admin, Technician, true),
            (Staff, Admin, false),
            (Staff, Staff, true),
            (Staff, Technician, true),
            (Technician, Admin, false),
            (Technician, Staff, false),
            (Technician, Technician, true),
        ] {
            assert_eq!(current.allows(required), expected);
            assert_eq!(
                current.allows(required),
                current.level() >= required.level()
            );
        }
    }

    #[test]
    fn test_signed_link_expiries_differ_by_audience() {
        assert_eq!(LinkAudience::Customer.expiry(), Duration::from_secs(60));
        assert_eq!(LinkAudience::Admin.expiry(), Duration::from_secs(3600));
        assert!(LinkAudience::Admin.expiry() > LinkAudience::Customer.expiry());
    }

    #[test]
    fn test_cancellation_review_outcomes() {
        assert_eq!(review_status(true), REVIEW_APPROVED);
        assert_eq!(review_status(false), REVIEW_REJECTED);
    }

    #[test]
    fn test_new_tickets_use_known_status_and_priority() {
        assert!(is_valid_status(STATUS_NEW));
        assert!(is_valid_priority(PRIORITY_NORMAL));
        assert_eq!(status_label(STATUS_NEW), "New");
    }

    #[test]
    fn test_tokens_keep_realms_apart() {
        let customer = issue_token("s3cret", Uuid::new_v4(), REALM_CUSTOMER, "c@x.io", None)
            .expect("customer token");
        let admin = issue_token(
            "s3cret",
            Uuid::new_v4(),
            REALM_ADMIN,
            "a@x.io",
            Some("technician"),
        )
        .expect("admin token");

        let customer_claims = decode_token("s3cret", &customer).expect("decode customer");
        let admin_claims = decode_token("s3cret", &admin).expect("decode admin");

        assert_eq!(customer_claims.realm, REALM_CUSTOMER);
        assert!(customer_claims.role.is_none());
        assert_eq!(admin_claims.realm, REALM_ADMIN);
        assert_eq!(admin_claims.role.as_deref(), Some("technician"));
    }
}
