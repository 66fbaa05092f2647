//! Endpoint registry and descriptors
//!
//! Every fetchable sub-resource is a variant of [`Endpoint`]. A variant knows
//! its URL template, its artifact file name template and the storage
//! [`Category`] it belongs to, so there is no runtime lookup table to drift
//! out of sync with the request code.

use crate::ItemId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage grouping of a resource kind (the subdirectory under the data root)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Activity details and activity sub-resources
    Activities,
    /// Club details and club sub-resources
    Clubs,
    /// Routes
    Routes,
}

impl Category {
    /// Directory name used under the storage root
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Activities => "activities",
            Category::Clubs => "clubs",
            Category::Routes => "routes",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Closed registry of per-item endpoints
///
/// # Examples
///
/// ```
/// use strava_archive::endpoint::{Category, Endpoint};
///
/// let laps: Endpoint = "laps".parse().unwrap();
/// assert_eq!(laps.artifact_name_of(42), "activity_42_laps.json");
/// assert_eq!(laps.category(), Category::Activities);
/// assert!("bogus".parse::<Endpoint>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// Detailed activity, including all segment efforts
    Activity,
    /// Laps of an activity
    ActivityLaps,
    /// Heart-rate and power zones of an activity
    ActivityZones,
    /// Comments on an activity
    ActivityComments,
    /// Kudoers of an activity
    ActivityKudos,
    /// Route details
    Route,
    /// Club details
    Club,
    /// Members of a club
    ClubMembers,
    /// Recent activities of a club
    ClubActivities,
}

impl Endpoint {
    /// All registered endpoints, in registry order
    pub const ALL: [Endpoint; 9] = [
        Endpoint::Activity,
        Endpoint::ActivityLaps,
        Endpoint::ActivityZones,
        Endpoint::ActivityComments,
        Endpoint::ActivityKudos,
        Endpoint::Route,
        Endpoint::Club,
        Endpoint::ClubMembers,
        Endpoint::ClubActivities,
    ];

    /// Registry key used on the command line and in logs
    pub fn key(&self) -> &'static str {
        match self {
            Endpoint::Activity => "activities",
            Endpoint::ActivityLaps => "laps",
            Endpoint::ActivityZones => "zones",
            Endpoint::ActivityComments => "comments",
            Endpoint::ActivityKudos => "kudos",
            Endpoint::Route => "routes",
            Endpoint::Club => "clubs",
            Endpoint::ClubMembers => "club-members",
            Endpoint::ClubActivities => "club-activities",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Endpoint::Activity => "detailed activity",
            Endpoint::ActivityLaps => "laps",
            Endpoint::ActivityZones => "zones",
            Endpoint::ActivityComments => "comments",
            Endpoint::ActivityKudos => "kudos",
            Endpoint::Route => "route",
            Endpoint::Club => "club",
            Endpoint::ClubMembers => "club members",
            Endpoint::ClubActivities => "club activities",
        }
    }

    /// Storage category of the artifacts this endpoint produces
    pub fn category(&self) -> Category {
        match self {
            Endpoint::Activity
            | Endpoint::ActivityLaps
            | Endpoint::ActivityZones
            | Endpoint::ActivityComments
            | Endpoint::ActivityKudos => Category::Activities,
            Endpoint::Route => Category::Routes,
            Endpoint::Club | Endpoint::ClubMembers | Endpoint::ClubActivities => Category::Clubs,
        }
    }

    /// Path and query relative to the API base URL
    pub fn path_of(&self, id: ItemId) -> String {
        match self {
            Endpoint::Activity => format!("/activities/{id}?include_all_efforts=true"),
            Endpoint::ActivityLaps => format!("/activities/{id}/laps"),
            Endpoint::ActivityZones => format!("/activities/{id}/zones"),
            Endpoint::ActivityComments => format!("/activities/{id}/comments"),
            Endpoint::ActivityKudos => format!("/activities/{id}/kudos"),
            Endpoint::Route => format!("/routes/{id}"),
            Endpoint::Club => format!("/clubs/{id}"),
            Endpoint::ClubMembers => format!("/clubs/{id}/members"),
            Endpoint::ClubActivities => format!("/clubs/{id}/activities"),
        }
    }

    /// File name of the persisted artifact for `id`
    pub fn artifact_name_of(&self, id: ItemId) -> String {
        match self {
            Endpoint::Activity => format!("activity_{id}.json"),
            Endpoint::ActivityLaps => format!("activity_{id}_laps.json"),
            Endpoint::ActivityZones => format!("activity_{id}_zones.json"),
            Endpoint::ActivityComments => format!("activity_{id}_comments.json"),
            Endpoint::ActivityKudos => format!("activity_{id}_kudos.json"),
            Endpoint::Route => format!("route_{id}.json"),
            Endpoint::Club => format!("club_{id}.json"),
            Endpoint::ClubMembers => format!("club_{id}_members.json"),
            Endpoint::ClubActivities => format!("club_{id}_activities.json"),
        }
    }

    /// Bind this endpoint to an API base URL
    pub fn descriptor(self, base_url: impl Into<String>) -> EndpointDescriptor {
        EndpointDescriptor::new(self, base_url)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Endpoint::ALL
            .into_iter()
            .find(|endpoint| endpoint.key() == key)
            .ok_or_else(|| EndpointError::UnknownEndpoint(s.to_string()))
    }
}

/// An endpoint bound to a concrete API base URL
///
/// Immutable; built once per batch and shared by every unit of that batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    endpoint: Endpoint,
    base_url: String,
}

impl EndpointDescriptor {
    /// Create a descriptor. A trailing slash on `base_url` is ignored.
    pub fn new(endpoint: Endpoint, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { endpoint, base_url }
    }

    /// The underlying registry entry
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// API base URL (without trailing slash)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full request URL for `id`
    pub fn url_of(&self, id: ItemId) -> String {
        format!("{}{}", self.base_url, self.endpoint.path_of(id))
    }

    /// Artifact file name for `id`
    pub fn artifact_name_of(&self, id: ItemId) -> String {
        self.endpoint.artifact_name_of(id)
    }

    /// Storage category
    pub fn category(&self) -> Category {
        self.endpoint.category()
    }
}

/// Errors raised while resolving endpoints
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// Registry key does not name any endpoint
    #[error("unknown endpoint '{0}': expected one of activities, laps, zones, comments, kudos, routes, clubs, club-members, club-activities")]
    UnknownEndpoint(String),
}
