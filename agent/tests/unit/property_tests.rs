//! Property-based tests for command parsing and identity strings.
//!
//! Uses `proptest` to verify invariants across many random inputs.

use proptest::prelude::*;

use rasp_agent::domain::{Command, CommandError, parse_command};
use rasp_common::ProbeIdentity;

proptest! {
    /// Well-formed attach commands keep checksum and path verbatim.
    #[test]
    fn prop_attach_fields_round_trip(
        checksum in "[0-9a-f]{1,64}",
        path in "/[a-zA-Z0-9_./-]{1,40}",
        pad in "[ \t]{0,3}",
    ) {
        let cmd = parse_command(&format!("{pad}attach;{checksum};{path}{pad}")).unwrap();
        prop_assert_eq!(cmd.checksum(), Some(checksum.as_str()));
        prop_assert_eq!(cmd.module_path(), Some(std::path::Path::new(&path)));
    }

    /// Anything after `detach;` is ignored.
    #[test]
    fn prop_detach_ignores_trailing_fields(rest in "[^\n]{0,40}") {
        prop_assert_eq!(parse_command(&format!("detach;{rest}")).unwrap(), Command::Detach);
    }

    /// Verbs other than the two known ones are rejected.
    #[test]
    fn prop_unknown_verbs_rejected(verb in "[a-zA-Z]{1,12}") {
        prop_assume!(verb != "attach" && verb != "detach");
        let is_unknown_verb = matches!(
            parse_command(&format!("{verb};abc;/p")),
            Err(CommandError::UnknownVerb(_))
        );
        prop_assert!(is_unknown_verb);
    }

    /// More than three attach fields is an error, never a silent truncation.
    #[test]
    fn prop_attach_rejects_extra_fields(extra in "[a-z0-9]{0,10}") {
        let is_trailing = matches!(
            parse_command(&format!("attach;abc;/p.pkg;{extra}")),
            Err(CommandError::TrailingFields { .. })
        );
        prop_assert!(is_trailing);
    }

    /// Identity strings parse back to the same version and checksum, including
    /// semver pre-release versions that contain `-`.
    #[test]
    fn prop_identity_round_trips(
        major in 0u32..50,
        minor in 0u32..50,
        pre in proptest::option::of("[a-z]{1,6}(-[0-9]{1,2})?"),
        checksum in "[0-9a-f]{64}",
    ) {
        let version = match pre {
            Some(pre) => format!("{major}.{minor}.0-{pre}"),
            None => format!("{major}.{minor}.0"),
        };
        let identity = ProbeIdentity::new(version, checksum);
        let parsed: ProbeIdentity = identity.to_string().parse().unwrap();
        prop_assert_eq!(parsed, identity);
    }
}
