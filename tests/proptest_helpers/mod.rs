#![allow(dead_code)]

use nix_src::hash::ContentHash;
use nix_src::{ResolvedDescriptor, SourceLocator, Version};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// An owner or repository name.
pub fn repo_segment() -> BoxedStrategy<String> {
    proptest::string::string_regex("[A-Za-z0-9_-]{1,24}")
        .expect("valid segment regex")
        .boxed()
}

/// Commit ids, tag names and branch-like revisions.
pub fn revision() -> BoxedStrategy<String> {
    prop_oneof![
        proptest::string::string_regex("[0-9a-f]{7,40}").expect("valid sha regex"),
        proptest::string::string_regex("v?[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}")
            .expect("valid tag regex"),
        proptest::string::string_regex("[A-Za-z0-9._/@+-]{1,30}").expect("valid rev regex"),
    ]
    .boxed()
}

pub fn metadata() -> BoxedStrategy<Option<String>> {
    proptest::option::of(
        proptest::string::string_regex("[A-Za-z0-9.-]{1,12}").expect("valid metadata regex"),
    )
    .boxed()
}

pub fn arb_version() -> BoxedStrategy<Version> {
    (any::<u64>(), any::<u64>(), any::<u64>(), metadata())
        .prop_map(|(major, minor, patch, metadata)| Version {
            major,
            minor,
            patch,
            metadata,
        })
        .boxed()
}

/// Versions drawn from a small range so that collisions actually happen.
pub fn arb_small_version() -> BoxedStrategy<Version> {
    (0u64..4, 0u64..4, 0u64..4, metadata())
        .prop_map(|(major, minor, patch, metadata)| Version {
            major,
            minor,
            patch,
            metadata,
        })
        .boxed()
}

pub fn arb_descriptor() -> BoxedStrategy<ResolvedDescriptor> {
    let repository = (repo_segment(), repo_segment(), revision())
        .prop_map(|(owner, repo, rev)| (SourceLocator::repository(owner, repo), rev));
    let url = proptest::string::string_regex("https://[a-z]{1,10}\\.org/[a-z0-9._-]{1,20}")
        .expect("valid url regex")
        .prop_map(|url| (SourceLocator::url(url.clone()), url));

    (prop_oneof![repository, url], any::<[u8; 32]>())
        .prop_map(|((locator, revision), digest)| {
            ResolvedDescriptor::new(locator, revision, ContentHash::from_digest(digest))
                .expect("non-empty revision")
        })
        .boxed()
}
