use nix_src::hash::ContentHash;
use nix_src::serialize::{serialize, Format};
use nix_src::SourceLocator;
use proptest::prelude::*;
use serde_json::Value;

mod proptest_helpers;

const GITHUB_PREFIX: &str = "fetchFromGitHub {";
const URL_PREFIX: &str = "fetchurl {";

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn serialization_is_deterministic(
        descriptor in proptest_helpers::arb_descriptor(),
    ) {
        for format in [Format::Json, Format::Nix] {
            prop_assert_eq!(serialize(&descriptor, format), serialize(&descriptor, format));
        }
    }

    #[test]
    fn json_document_carries_the_descriptor(
        descriptor in proptest_helpers::arb_descriptor(),
    ) {
        let bytes = serialize(&descriptor, Format::Json);
        let document: Value = serde_json::from_slice(&bytes).expect("valid json");
        let object = document.as_object().expect("json object");

        let keys: Vec<&String> = object.keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(keys, sorted);

        let hash = object["sha256"].as_str().expect("sha256 string");
        prop_assert_eq!(ContentHash::parse(hash).expect("hash parses"), *descriptor.content_hash());

        match descriptor.locator() {
            SourceLocator::Repository { owner, repo, .. } => {
                prop_assert_eq!(object["owner"].as_str(), Some(owner.as_str()));
                prop_assert_eq!(object["repo"].as_str(), Some(repo.as_str()));
                prop_assert_eq!(object["rev"].as_str(), Some(descriptor.revision()));
            }
            SourceLocator::Url { url } => {
                prop_assert_eq!(object["url"].as_str(), Some(url.as_str()));
            }
        }
    }

    #[test]
    fn nix_expression_names_every_field(
        descriptor in proptest_helpers::arb_descriptor(),
    ) {
        let text = String::from_utf8(serialize(&descriptor, Format::Nix)).expect("utf8");
        let sri = descriptor.content_hash().to_sri();
        prop_assert!(text.contains(&sri));
        match descriptor.locator() {
            SourceLocator::Repository { .. } => {
                prop_assert!(text.starts_with(GITHUB_PREFIX), "unexpected prefix: {}", text);
            }
            SourceLocator::Url { .. } => {
                prop_assert!(text.starts_with(URL_PREFIX), "unexpected prefix: {}", text);
            }
        }
    }
}
