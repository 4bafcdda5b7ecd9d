use crate::{
    bucketer::Bucketer,
    flag_cache::FlagSnapshot,
    flags::{FlagDefinition, TryParse},
    selector::{select_variant, BucketDraw},
    Error, Result,
};

impl FlagSnapshot {
    fn get_flag(&self, flag_name: &str) -> Result<&FlagDefinition> {
        match self.flags.get(flag_name).ok_or(Error::FlagNotFound)? {
            TryParse::Parsed(flag) => Ok(flag),
            TryParse::ParseFailed(_) => Err(Error::FlagParseError),
        }
    }

    /// Evaluate the on/off state of a flag. Experiments report their gate.
    pub fn eval_enabled(&self, flag_name: &str) -> Result<bool> {
        Ok(self.get_flag(flag_name)?.enabled)
    }

    /// Evaluate the variant `identity` is assigned for an experiment.
    ///
    /// Returns `Ok(None)` if the flag exists but assigns no variant: it is disabled or is not an
    /// experiment.
    pub fn eval_variant(
        &self,
        flag_name: &str,
        identity: &str,
        bucketer: &impl Bucketer,
    ) -> Result<Option<&str>> {
        self.get_flag(flag_name)?.eval_variant(identity, bucketer)
    }
}

impl FlagDefinition {
    pub fn eval_variant(&self, identity: &str, bucketer: &impl Bucketer) -> Result<Option<&str>> {
        // Disabled experiments never assign a treatment.
        if !self.enabled || !self.is_experiment() {
            return Ok(None);
        }

        let mut draw = BucketDraw(bucketer.bucket(identity));
        Ok(Some(select_variant(&self.variants, &mut draw)))
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, fs::File};

    use chrono::Utc;

    use crate::{
        bucketer::{DeterministicBucketer, Sha256Bucketer},
        flag_cache::FlagSnapshot,
        flags::FlagSet,
        Error,
    };

    fn snapshot() -> FlagSnapshot {
        let flags: FlagSet =
            serde_json::from_reader(File::open("tests/data/flags-v1.json").unwrap()).unwrap();
        FlagSnapshot::new(flags, Utc::now())
    }

    #[test]
    fn enabled_reflects_definition() {
        let snapshot = snapshot();
        assert!(snapshot.eval_enabled("simple-flag").unwrap());
        assert!(!snapshot.eval_enabled("disabled-flag").unwrap());
        assert!(snapshot.eval_enabled("experiment-flag").unwrap());
        assert!(!snapshot.eval_enabled("disabled-experiment").unwrap());
    }

    #[test]
    fn missing_and_broken_flags_are_errors() {
        let snapshot = snapshot();
        assert!(matches!(
            snapshot.eval_enabled("nonexistent-flag"),
            Err(Error::FlagNotFound)
        ));
        assert!(matches!(
            snapshot.eval_variant("nonexistent-flag", "alice", &Sha256Bucketer),
            Err(Error::FlagNotFound)
        ));
        assert!(matches!(
            snapshot.eval_enabled("broken-flag"),
            Err(Error::FlagParseError)
        ));
        assert!(matches!(
            snapshot.eval_variant("broken-flag", "alice", &Sha256Bucketer),
            Err(Error::FlagParseError)
        ));
    }

    #[test]
    fn non_experiment_assigns_nothing() {
        let snapshot = snapshot();
        assert_eq!(
            snapshot
                .eval_variant("simple-flag", "alice", &Sha256Bucketer)
                .unwrap(),
            None
        );
    }

    #[test]
    fn disabled_experiment_assigns_nothing_for_any_identity() {
        let snapshot = snapshot();
        for i in 0..100 {
            assert_eq!(
                snapshot
                    .eval_variant("disabled-experiment", &format!("user-{i}"), &Sha256Bucketer)
                    .unwrap(),
                None
            );
        }
    }

    #[test]
    fn variant_follows_identity_bucket() {
        let snapshot = snapshot();
        // bucket("alice") == 1, bucket("grace") == 56, bucket("user-3") == 72
        let cases = [
            ("experiment-flag", "alice", "control"),
            ("experiment-flag", "grace", "variant_a"),
            ("three-way-experiment", "alice", "control"),
            ("three-way-experiment", "grace", "variant_a"),
            ("three-way-experiment", "user-3", "variant_b"),
        ];
        for (flag, identity, expected) in cases {
            for _ in 0..5 {
                assert_eq!(
                    snapshot
                        .eval_variant(flag, identity, &Sha256Bucketer)
                        .unwrap(),
                    Some(expected),
                    "{flag} / {identity}"
                );
            }
        }
    }

    #[test]
    fn variant_uses_injected_bucketer() {
        let snapshot = snapshot();
        let bucketer = DeterministicBucketer(HashMap::from([
            ("low".to_owned(), 0),
            ("high".to_owned(), 99),
        ]));
        assert_eq!(
            snapshot
                .eval_variant("three-way-experiment", "low", &bucketer)
                .unwrap(),
            Some("control")
        );
        assert_eq!(
            snapshot
                .eval_variant("three-way-experiment", "high", &bucketer)
                .unwrap(),
            Some("variant_b")
        );
    }
}
