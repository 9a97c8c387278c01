use crate::error::{FarmError, Result};

/// A host's declared concurrent-task capacity.
///
/// A host may appear more than once in a pool to express independent slot
/// groups with different characteristics; no deduplication is performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGroup {
    pub host: String,
    pub capacity: u32,
}

/// Ordered collection of slot groups. Iteration order is the round-robin
/// order of the dispatch loop.
#[derive(Debug, Clone)]
pub struct HostPool {
    groups: Vec<SlotGroup>,
}

impl HostPool {
    /// Parse a whitespace-separated list of `host[:count]` tokens.
    ///
    /// Each token splits on its last `:`. A token with no colon, a trailing
    /// colon, or a colon that leaves the whole token intact gets capacity 1.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut groups = Vec::new();
        for token in spec.split_whitespace() {
            groups.push(parse_group(token)?);
        }
        if groups.is_empty() {
            return Err(FarmError::Config("host pool spec is empty".to_string()));
        }
        Ok(Self { groups })
    }

    /// Single-host pool used when no spec is configured.
    pub fn single(host: String) -> Self {
        Self {
            groups: vec![SlotGroup { host, capacity: 1 }],
        }
    }

    pub fn groups(&self) -> &[SlotGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Sum of all group capacities, reported by `--count`.
    pub fn total_capacity(&self) -> u64 {
        self.groups.iter().map(|g| u64::from(g.capacity)).sum()
    }
}

fn parse_group(token: &str) -> Result<SlotGroup> {
    let (host, count) = match token.rsplit_once(':') {
        None => (token, None),
        // ":4" leaves no host; keep the whole token.
        Some((host, _)) if host.is_empty() => (token, None),
        // "hostA:" has an empty count; capacity defaults to 1.
        Some((host, rest)) if rest.is_empty() => (host, None),
        Some((host, rest)) => (host, Some(rest)),
    };

    let capacity = match count {
        None => 1,
        Some(text) => {
            let n: u32 = text.parse().map_err(|_| {
                FarmError::Config(format!("invalid slot count {text:?} in token {token:?}"))
            })?;
            if n == 0 {
                return Err(FarmError::Config(format!(
                    "slot count must be at least 1 in token {token:?}"
                )));
            }
            n
        }
    };

    Ok(SlotGroup {
        host: host.to_string(),
        capacity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mixed_tokens() {
        let pool = HostPool::parse("hostA:1 hostB:2 hostC").unwrap();
        let caps: Vec<_> = pool.groups().iter().map(|g| g.capacity).collect();
        assert_eq!(caps, vec![1, 2, 1]);
        assert_eq!(pool.groups()[2].host, "hostC");
    }

    #[test]
    fn trailing_colon_defaults_to_one() {
        let pool = HostPool::parse("hostA:").unwrap();
        assert_eq!(pool.groups()[0].host, "hostA");
        assert_eq!(pool.groups()[0].capacity, 1);
    }

    #[test]
    fn last_colon_wins() {
        let pool = HostPool::parse("node:0:4").unwrap();
        assert_eq!(pool.groups()[0].host, "node:0");
        assert_eq!(pool.groups()[0].capacity, 4);
    }

    #[test]
    fn duplicate_hosts_kept() {
        let pool = HostPool::parse("a:2 a:1").unwrap();
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn empty_spec_is_config_error() {
        assert!(matches!(HostPool::parse("  "), Err(FarmError::Config(_))));
    }

    #[test]
    fn bad_count_is_config_error() {
        assert!(matches!(HostPool::parse("a:x"), Err(FarmError::Config(_))));
        assert!(matches!(HostPool::parse("a:0"), Err(FarmError::Config(_))));
    }

    #[test]
    fn total_capacity_sums_groups() {
        let pool = HostPool::parse("hostA:1 hostB:2 hostC:1").unwrap();
        assert_eq!(pool.total_capacity(), 4);
    }
}
