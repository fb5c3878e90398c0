//! User-facing wording for known contract aborts.
//!
//! Aborts arrive as free-form node messages; they are matched by the
//! contract's error constant names.

pub const NO_FUNDS_MESSAGE: &str = "No funds available to withdraw.";
pub const NOT_CREATOR_WITHDRAW_MESSAGE: &str = "Only the creator can withdraw funds.";
pub const HAS_SUBSCRIBERS_MESSAGE: &str =
    "Cannot delete profile: you still have active subscribers. Wait for all subscriptions to expire first.";
pub const NOT_OWNER_DELETE_MESSAGE: &str = "Cannot delete profile: you are not the owner of this service.";
pub const NO_ACCESS_MESSAGE: &str = "You need an active subscription to view this content";

/// Abort names that mean "this creator is already registered".
pub fn is_already_registered(raw: &str) -> bool {
    raw.contains("ECreatorAlreadyExists") || raw.contains("MoveAbort")
}

pub fn withdraw_error_message(raw: &str) -> String {
    if raw.contains("ENoFundsToWithdraw") || raw.contains("MoveAbort") {
        NO_FUNDS_MESSAGE.to_string()
    } else if raw.contains("ENotCreator") {
        NOT_CREATOR_WITHDRAW_MESSAGE.to_string()
    } else {
        raw.to_string()
    }
}

pub fn delete_profile_error_message(raw: &str) -> String {
    if raw.contains("EHasSubscribers") || raw.contains("MoveAbort") {
        HAS_SUBSCRIBERS_MESSAGE.to_string()
    } else if raw.contains("ENotCreator") {
        NOT_OWNER_DELETE_MESSAGE.to_string()
    } else {
        raw.to_string()
    }
}

pub fn decrypt_error_message(raw: &str) -> String {
    if raw.contains("ENoAccess") || raw.contains("access") {
        NO_ACCESS_MESSAGE.to_string()
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn withdraw_aborts() {
        assert_eq!(
            withdraw_error_message("MoveAbort(service, 3) ENoFundsToWithdraw"),
            NO_FUNDS_MESSAGE
        );
        assert_eq!(withdraw_error_message("ENotCreator"), NOT_CREATOR_WITHDRAW_MESSAGE);
        assert_eq!(withdraw_error_message("network down"), "network down");
    }

    #[test]
    fn generic_abort_wins_over_not_creator() {
        // a MoveAbort carrying ENotCreator still reads as "no funds"
        assert_eq!(withdraw_error_message("MoveAbort: ENotCreator"), NO_FUNDS_MESSAGE);
        assert_eq!(
            delete_profile_error_message("MoveAbort: ENotCreator"),
            HAS_SUBSCRIBERS_MESSAGE
        );
    }

    #[test]
    fn delete_aborts() {
        assert_eq!(delete_profile_error_message("EHasSubscribers"), HAS_SUBSCRIBERS_MESSAGE);
        assert_eq!(delete_profile_error_message("ENotCreator"), NOT_OWNER_DELETE_MESSAGE);
    }

    #[test]
    fn decrypt_access_errors() {
        assert_eq!(decrypt_error_message("ENoAccess: tier 2 required"), NO_ACCESS_MESSAGE);
        assert_eq!(decrypt_error_message("no access to key"), NO_ACCESS_MESSAGE);
        assert_eq!(decrypt_error_message("quorum not reached"), "quorum not reached");
    }
}
