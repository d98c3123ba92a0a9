//! Boot configuration matching
//!
//! Every configuration in the requested profile is scored against the node.
//! Targeting dimensions add up:
//!
//! | dimension | score |
//! |-----------|-------|
//! | boot MAC listed | +100 |
//! | each matching NID | +75 |
//! | each matching host pattern | +50 |
//! | each shared group | +25 |
//!
//! A configuration with no targeting at all scores 1 and acts as a catch-all.
//! The highest score wins, then the highest priority. A request for a
//! non-default profile with no positive candidate falls back to `default`.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use boot_client::ResourceClient;
use crds::{BootConfiguration, BootConfigurationSpec, DEFAULT_PROFILE, Node, NodeSpec};
use kube::ResourceExt;
use tracing::{debug, info};

use crate::error::BootScriptError;
use crate::resolver::bounded;

pub const MAC_SCORE: u32 = 100;
pub const NID_SCORE: u32 = 75;
pub const HOST_SCORE: u32 = 50;
pub const GROUP_SCORE: u32 = 25;
pub const CATCH_ALL_SCORE: u32 = 1;

/// Host pattern matching everything
pub const WILDCARD_HOST: &str = "*";

/// Empty profile means default.
pub fn normalize_profile(profile: &str) -> &str {
    let profile = profile.trim();
    if profile.is_empty() { DEFAULT_PROFILE } else { profile }
}

fn host_matches(pattern: &str, node: &NodeSpec) -> bool {
    pattern == WILDCARD_HOST || pattern == node.xname || (!node.hostname.is_empty() && pattern == node.hostname)
}

fn count_to_score(count: usize, weight: u32) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX).saturating_mul(weight)
}

/// Score one configuration against one node
pub fn score(config: &BootConfigurationSpec, node: &NodeSpec) -> u32 {
    if !config.has_targeting() {
        return CATCH_ALL_SCORE;
    }

    let mut score = 0u32;
    if config.macs.iter().any(|mac| node.has_boot_mac(mac)) {
        score += MAC_SCORE;
    }
    if let Some(nid) = node.nid {
        let hits = config.nids.iter().filter(|n| **n == nid).count();
        score = score.saturating_add(count_to_score(hits, NID_SCORE));
    }
    let hits = config.hosts.iter().filter(|h| host_matches(h, node)).count();
    score = score.saturating_add(count_to_score(hits, HOST_SCORE));
    let hits = config.groups.iter().filter(|g| node.in_group(g)).count();
    score.saturating_add(count_to_score(hits, GROUP_SCORE))
}

/// A scored configuration
#[derive(Debug, Clone, Copy)]
pub struct ConfigCandidate<'a> {
    pub config: &'a BootConfiguration,
    pub score: u32,
}

impl ConfigCandidate<'_> {
    fn rank(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| other.config.spec.priority.cmp(&self.config.spec.priority))
    }
}

/// Best configuration scoped to exactly `profile`
///
/// Equal score and priority keep the order of `configs`.
pub fn select_best<'a>(configs: &'a [BootConfiguration], node: &NodeSpec, profile: &str) -> Option<ConfigCandidate<'a>> {
    let mut candidates: Vec<ConfigCandidate<'a>> = configs
        .iter()
        .filter(|config| config.spec.effective_profile() == profile)
        .map(|config| ConfigCandidate {
            config,
            score: score(&config.spec, node),
        })
        .filter(|candidate| candidate.score > 0)
        .collect();

    candidates.sort_by(ConfigCandidate::rank);
    candidates.into_iter().next()
}

/// Best configuration for `requested`, falling back to the default profile
pub fn select_with_fallback<'a>(
    configs: &'a [BootConfiguration],
    node: &NodeSpec,
    requested: &str,
) -> Option<ConfigCandidate<'a>> {
    let profile = normalize_profile(requested);
    if profile != DEFAULT_PROFILE {
        if let Some(candidate) = select_best(configs, node, profile) {
            return Some(candidate);
        }
        info!(
            "No configuration in profile {} for node {}, falling back to {}",
            profile, node.xname, DEFAULT_PROFILE
        );
    }
    select_best(configs, node, DEFAULT_PROFILE)
}

/// Selects boot configurations from the resource store
#[derive(Clone)]
pub struct ConfigMatcher {
    client: Arc<dyn ResourceClient>,
    query_timeout: Duration,
}

impl std::fmt::Debug for ConfigMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigMatcher")
            .field("query_timeout", &self.query_timeout)
            .finish_non_exhaustive()
    }
}

impl ConfigMatcher {
    pub fn new(client: Arc<dyn ResourceClient>, query_timeout: Duration) -> Self {
        Self { client, query_timeout }
    }

    /// Find the configuration `node` should boot for `profile`
    pub async fn find_boot_configuration(&self, node: &Node, profile: &str) -> Result<BootConfiguration, BootScriptError> {
        let configs = bounded(
            self.query_timeout,
            "boot configuration query",
            self.client.get_boot_configurations(),
        )
        .await?;

        let candidate = select_with_fallback(&configs, &node.spec, profile).ok_or_else(|| {
            BootScriptError::NoMatchingConfiguration {
                node: node.spec.xname.clone(),
                profile: normalize_profile(profile).to_string(),
            }
        })?;

        debug!(
            "Selected configuration {} for node {} (score {}, priority {})",
            candidate.config.name_any(),
            node.spec.xname,
            candidate.score,
            candidate.config.spec.priority
        );
        Ok(candidate.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boot_client::MockResourceClient;

    fn node() -> NodeSpec {
        NodeSpec {
            xname: "x1000c0s0b0n0".to_string(),
            hostname: "nid000005".to_string(),
            nid: Some(5),
            boot_mac: Some("aa:bb:cc:dd:ee:ff".to_string()),
            groups: vec!["compute".to_string(), "gpu".to_string()],
        }
    }

    fn config(name: &str, spec: BootConfigurationSpec) -> BootConfiguration {
        BootConfiguration::new(
            name,
            BootConfigurationSpec {
                kernel: "http://boot/vmlinuz".to_string(),
                ..spec
            },
        )
    }

    #[test]
    fn test_score_per_dimension() {
        let node = node();
        let mac = BootConfigurationSpec {
            macs: vec!["AA:BB:CC:DD:EE:FF".to_string()],
            ..Default::default()
        };
        assert_eq!(score(&mac, &node), 100);

        let nid = BootConfigurationSpec {
            nids: vec![5, 6],
            ..Default::default()
        };
        assert_eq!(score(&nid, &node), 75);

        let hosts = BootConfigurationSpec {
            hosts: vec!["x1000c0s0b0n0".to_string(), "nid000005".to_string(), "other".to_string()],
            ..Default::default()
        };
        assert_eq!(score(&hosts, &node), 100);

        let wildcard = BootConfigurationSpec {
            hosts: vec!["*".to_string()],
            ..Default::default()
        };
        assert_eq!(score(&wildcard, &node), 50);

        let groups = BootConfigurationSpec {
            groups: vec!["compute".to_string(), "gpu".to_string(), "io".to_string()],
            ..Default::default()
        };
        assert_eq!(score(&groups, &node), 50);
    }

    #[test]
    fn test_scores_accumulate() {
        let spec = BootConfigurationSpec {
            macs: vec!["aa:bb:cc:dd:ee:ff".to_string()],
            groups: vec!["compute".to_string()],
            ..Default::default()
        };
        assert_eq!(score(&spec, &node()), 125);
    }

    #[test]
    fn test_catch_all_scores_one() {
        assert_eq!(score(&BootConfigurationSpec::default(), &node()), CATCH_ALL_SCORE);
    }

    #[test]
    fn test_non_matching_targeting_scores_zero() {
        let spec = BootConfigurationSpec {
            hosts: vec!["x9999c0s0b0n0".to_string()],
            nids: vec![42],
            ..Default::default()
        };
        assert_eq!(score(&spec, &node()), 0);
        assert!(select_best(&[config("c", spec)], &node(), DEFAULT_PROFILE).is_none());
    }

    #[test]
    fn test_score_beats_priority() {
        let configs = vec![
            config(
                "by-nid",
                BootConfigurationSpec {
                    nids: vec![5],
                    priority: 90,
                    ..Default::default()
                },
            ),
            config(
                "by-mac",
                BootConfigurationSpec {
                    macs: vec!["aa:bb:cc:dd:ee:ff".to_string()],
                    priority: 10,
                    ..Default::default()
                },
            ),
        ];
        let best = select_best(&configs, &node(), DEFAULT_PROFILE).unwrap();
        assert_eq!(best.config.name_any(), "by-mac");
        assert_eq!(best.score, 100);
    }

    #[test]
    fn test_priority_breaks_ties_then_order() {
        let by_group = |priority| BootConfigurationSpec {
            groups: vec!["compute".to_string()],
            priority,
            ..Default::default()
        };
        let configs = vec![
            config("low", by_group(10)),
            config("high-first", by_group(50)),
            config("high-second", by_group(50)),
        ];
        let best = select_best(&configs, &node(), DEFAULT_PROFILE).unwrap();
        assert_eq!(best.config.name_any(), "high-first");
    }

    #[test]
    fn test_profiles_do_not_mix() {
        let configs = vec![config(
            "gpu-only",
            BootConfigurationSpec {
                macs: vec!["aa:bb:cc:dd:ee:ff".to_string()],
                profile: "gpu".to_string(),
                ..Default::default()
            },
        )];
        assert!(select_with_fallback(&configs, &node(), "").is_none());
        assert!(select_with_fallback(&configs, &node(), "default").is_none());
        assert_eq!(
            select_with_fallback(&configs, &node(), "gpu").unwrap().config.name_any(),
            "gpu-only"
        );
    }

    #[test]
    fn test_requested_profile_falls_back_to_default() {
        let configs = vec![
            config("catch-all", BootConfigurationSpec::default()),
            config(
                "diag",
                BootConfigurationSpec {
                    hosts: vec!["x9999c0s0b0n0".to_string()],
                    profile: "burn-in".to_string(),
                    ..Default::default()
                },
            ),
        ];
        let best = select_with_fallback(&configs, &node(), "burn-in").unwrap();
        assert_eq!(best.config.name_any(), "catch-all");
        assert_eq!(best.score, CATCH_ALL_SCORE);
    }

    #[test]
    fn test_requested_profile_preferred_over_default() {
        let configs = vec![
            config(
                "default-mac",
                BootConfigurationSpec {
                    macs: vec!["aa:bb:cc:dd:ee:ff".to_string()],
                    ..Default::default()
                },
            ),
            config(
                "burn-in-catch-all",
                BootConfigurationSpec {
                    profile: "burn-in".to_string(),
                    ..Default::default()
                },
            ),
        ];
        let best = select_with_fallback(&configs, &node(), "burn-in").unwrap();
        assert_eq!(best.config.name_any(), "burn-in-catch-all");
    }

    #[tokio::test]
    async fn test_find_boot_configuration_no_match() {
        let mock = MockResourceClient::new();
        mock.add_boot_configuration(config(
            "elsewhere",
            BootConfigurationSpec {
                nids: vec![1],
                ..Default::default()
            },
        ));
        let matcher = ConfigMatcher::new(Arc::new(mock.clone()), Duration::from_secs(5));
        let node = Node::new("x1000c0s0b0n0", node());

        let result = matcher.find_boot_configuration(&node, "").await;
        assert!(matches!(
            result,
            Err(BootScriptError::NoMatchingConfiguration { profile, .. }) if profile == "default"
        ));
        assert_eq!(mock.config_queries(), 1);
    }
}
