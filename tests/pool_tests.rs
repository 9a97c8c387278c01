use farmrun::error::FarmError;
use farmrun::pool::HostPool;

#[test]
fn one_group_per_token_with_default_capacity() {
    let pool = HostPool::parse("hostA:1 hostB:2 hostC").unwrap();
    let entries: Vec<_> = pool
        .groups()
        .iter()
        .map(|g| (g.host.as_str(), g.capacity))
        .collect();
    assert_eq!(entries, vec![("hostA", 1), ("hostB", 2), ("hostC", 1)]);
}

#[test]
fn count_example_sums_to_four() {
    let pool = HostPool::parse("hostA:1 hostB:2 hostC:1").unwrap();
    assert_eq!(pool.total_capacity(), 4);
}

#[test]
fn iteration_order_is_spec_order() {
    let pool = HostPool::parse("z:1 a:1 m:1").unwrap();
    let hosts: Vec<_> = pool.groups().iter().map(|g| g.host.as_str()).collect();
    assert_eq!(hosts, vec!["z", "a", "m"]);
}

#[test]
fn fallback_pool_is_one_local_slot() {
    let pool = HostPool::single("thismachine".to_string());
    assert_eq!(pool.len(), 1);
    assert_eq!(pool.groups()[0].host, "thismachine");
    assert_eq!(pool.total_capacity(), 1);
}

#[test]
fn empty_spec_without_fallback_fails() {
    assert!(matches!(HostPool::parse(""), Err(FarmError::Config(_))));
}
