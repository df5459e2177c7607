use clikit::core::{details_of, expand_aliases, summary_of};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn paragraph() -> impl Strategy<Value = String> {
    prop::collection::vec(word(), 1..6).prop_map(|words| words.join(" "))
}

/// Help text and alias expansion properties
#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #[test]
        fn summary_and_details_split_paragraphs(
            paras in prop::collection::vec(paragraph(), 1..5),
            indent in 0usize..12,
            leading_newline in any::<bool>(),
        ) {
            let pad = " ".repeat(indent);
            let body = paras
                .iter()
                .map(|p| format!("{}{}", pad, p))
                .collect::<Vec<_>>()
                .join(&format!("\n{}\n", pad));
            let doc = if leading_newline { format!("\n{}\n{}", body, pad) } else { body };

            prop_assert_eq!(summary_of(&doc), paras[0].clone());
            prop_assert_eq!(details_of(&doc), paras[1..].join("\n\n"));
        }

        #[test]
        fn expansion_replaces_only_the_first_alias(
            prefix in prop::collection::vec("--[a-z]{1,4}", 0..4),
            rest in prop::collection::vec(word(), 0..4),
        ) {
            let mut aliases = BTreeMap::new();
            aliases.insert("ALIAS".to_string(), "update --status REOPENED".to_string());

            let mut tokens = prefix.clone();
            tokens.push("ALIAS".to_string());
            tokens.push("ALIAS".to_string());
            tokens.extend(rest.iter().cloned());

            let expanded = expand_aliases(tokens, &aliases, |_| false);

            let mut expected = prefix.clone();
            expected.extend(["update", "--status", "REOPENED", "ALIAS"].map(String::from));
            expected.extend(rest.iter().cloned());
            prop_assert_eq!(expanded, expected);
        }

        #[test]
        fn command_before_alias_prevents_expansion(
            tokens in prop::collection::vec(word(), 0..6),
        ) {
            let mut aliases = BTreeMap::new();
            aliases.insert("ALIAS".to_string(), "x y".to_string());

            let mut input = vec!["CMD".to_string()];
            input.extend(tokens.iter().cloned());
            input.push("ALIAS".to_string());

            let expanded = expand_aliases(input.clone(), &aliases, |t| t == "CMD");
            prop_assert_eq!(expanded, input);
        }
    }
}
