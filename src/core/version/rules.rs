// ─── Platform Rules ───
// Pure decisions over the ordered rule / natives lists of a library entry.

use std::collections::BTreeMap;

use crate::core::platform::{OsFamily, Platform};

use super::manifest::{NativeClassifier, Rule, RuleAction};

/// Decide whether a library applies to `os`.
///
/// The first rule that names an OS decides: `allow` keeps the entry only on
/// that OS, `disallow` keeps it everywhere else. Rules without an OS are
/// skipped. Without rules, an entry declaring natives applies only to the
/// platforms it has natives for.
pub fn is_allowed(
    rules: Option<&[Rule]>,
    natives: Option<&BTreeMap<String, NativeClassifier>>,
    os: OsFamily,
) -> bool {
    let rules = match rules {
        Some(rules) => rules,
        None => {
            return match natives {
                None => true,
                Some(natives) => natives.contains_key(os.as_str()),
            }
        }
    };

    for rule in rules {
        let Some(rule_os) = rule.os.as_ref().and_then(|selector| selector.name()) else {
            continue;
        };
        match rule.action {
            RuleAction::Allow => return rule_os == os.as_str(),
            RuleAction::Disallow => return rule_os != os.as_str(),
            RuleAction::Unknown => continue,
        }
    }

    true
}

/// Classifier of the native archive for `platform`, if the entry has one.
///
/// Per-architecture maps fall back to their `default` key. `${arch}` in the
/// result is replaced with the platform's bitness token.
pub fn native_classifier(
    natives: &BTreeMap<String, NativeClassifier>,
    platform: &Platform,
) -> Option<String> {
    let classifier = match natives.get(platform.os.as_str())? {
        NativeClassifier::Single(classifier) => classifier,
        NativeClassifier::PerArch(by_arch) => by_arch
            .get(&platform.arch)
            .or_else(|| by_arch.get("default"))?,
    };
    if classifier.is_empty() {
        return None;
    }
    Some(classifier.replace("${arch}", &platform.arch_bitness_token()))
}
