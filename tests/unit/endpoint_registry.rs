//! Unit tests for the endpoint registry

use std::collections::HashSet;
use strava_archive::endpoint::{Category, Endpoint, EndpointError};

#[test]
fn test_registry_keys_are_unique() {
    let keys: HashSet<_> = Endpoint::ALL.iter().map(|e| e.key()).collect();
    assert_eq!(keys.len(), Endpoint::ALL.len());
}

#[test]
fn test_artifact_names_do_not_collide_within_a_category() {
    for category in [Category::Activities, Category::Clubs, Category::Routes] {
        let mut names = HashSet::new();
        for endpoint in Endpoint::ALL.iter().filter(|e| e.category() == category) {
            for id in [1, 12, 123] {
                assert!(
                    names.insert(endpoint.artifact_name_of(id)),
                    "duplicate artifact name for {endpoint} {id}"
                );
            }
        }
    }
}

#[test]
fn test_activity_family_urls() {
    let base = "https://www.strava.com/api/v3";
    let cases = [
        ("activities", "/activities/5?include_all_efforts=true", "activity_5.json"),
        ("laps", "/activities/5/laps", "activity_5_laps.json"),
        ("zones", "/activities/5/zones", "activity_5_zones.json"),
        ("comments", "/activities/5/comments", "activity_5_comments.json"),
        ("kudos", "/activities/5/kudos", "activity_5_kudos.json"),
    ];

    for (key, path, name) in cases {
        let descriptor = key.parse::<Endpoint>().unwrap().descriptor(base);
        assert_eq!(descriptor.url_of(5), format!("{base}{path}"));
        assert_eq!(descriptor.artifact_name_of(5), name);
        assert_eq!(descriptor.category(), Category::Activities);
    }
}

#[test]
fn test_unknown_key_is_programmer_error() {
    let err = "athlete".parse::<Endpoint>().unwrap_err();
    assert!(matches!(err, EndpointError::UnknownEndpoint(ref key) if key == "athlete"));
}

#[test]
fn test_descriptor_trims_trailing_slash() {
    let descriptor = Endpoint::ClubActivities.descriptor("http://127.0.0.1:8080/");
    assert_eq!(descriptor.base_url(), "http://127.0.0.1:8080");
    assert_eq!(
        descriptor.url_of(3),
        "http://127.0.0.1:8080/clubs/3/activities"
    );
}
