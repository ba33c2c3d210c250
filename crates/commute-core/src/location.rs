//! Locations, routes and the gazetteer used by the distance heuristic.

use serde::{Deserialize, Serialize};

/// Keyword lists used to classify free-text addresses.
///
/// Externally configurable; the default lists match the São Paulo setup the
/// dashboard shipped with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gazetteer {
    #[serde(default = "default_cities")]
    pub cities: Vec<String>,
    #[serde(default = "default_central_keywords")]
    pub central_keywords: Vec<String>,
}

fn default_cities() -> Vec<String> {
    ["são paulo", "sp", "rio de janeiro", "rj", "belo horizonte", "mg"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_central_keywords() -> Vec<String> {
    [
        "centro",
        "downtown",
        "paulista",
        "faria lima",
        "berrini",
        "vila madalena",
        "pinheiros",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for Gazetteer {
    fn default() -> Self {
        Self {
            cities: default_cities(),
            central_keywords: default_central_keywords(),
        }
    }
}

impl Gazetteer {
    /// True when both addresses resolve to the same city key.
    pub fn shares_city(&self, a: &LocationDescriptor, b: &LocationDescriptor) -> bool {
        match (a.city_key(self), b.city_key(self)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Where a route starts or ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LocationDescriptor {
    /// Free-text street address
    Address(String),
    /// Opaque name such as "home"; carries no geography
    Label(String),
}

impl LocationDescriptor {
    pub fn address(text: impl Into<String>) -> Self {
        LocationDescriptor::Address(text.into())
    }

    pub fn label(text: impl Into<String>) -> Self {
        LocationDescriptor::Label(text.into())
    }

    pub fn text(&self) -> &str {
        match self {
            LocationDescriptor::Address(s) | LocationDescriptor::Label(s) => s,
        }
    }

    fn address_lower(&self) -> Option<String> {
        match self {
            LocationDescriptor::Address(s) if !s.trim().is_empty() => Some(s.to_lowercase()),
            _ => None,
        }
    }

    /// Whether the address mentions a central neighbourhood.
    pub fn is_central(&self, gazetteer: &Gazetteer) -> bool {
        self.address_lower().is_some_and(|addr| {
            gazetteer
                .central_keywords
                .iter()
                .any(|k| addr.contains(&k.to_lowercase()))
        })
    }

    /// First gazetteer city contained in the address, in gazetteer order.
    pub fn city_key(&self, gazetteer: &Gazetteer) -> Option<String> {
        let addr = self.address_lower()?;
        gazetteer
            .cities
            .iter()
            .map(|c| c.to_lowercase())
            .find(|c| addr.contains(c))
    }

    /// Whether the distance heuristic can use this descriptor.
    pub fn is_geographic(&self) -> bool {
        self.address_lower().is_some()
    }

    /// Street part of the descriptor, shortened for display.
    pub fn short_name(&self) -> String {
        let first = self.text().split(',').next().unwrap_or("").trim();
        if first.is_empty() {
            return "Unknown".to_string();
        }
        if first.chars().count() > 25 {
            let cut: String = first.chars().take(25).collect();
            format!("{cut}...")
        } else {
            first.to_string()
        }
    }
}

/// Human-readable route name, e.g. `Via Av. Paulista → Rua Augusta`.
pub fn route_name(from: &LocationDescriptor, to: &LocationDescriptor) -> String {
    format!("Via {} → {}", from.short_name(), to.short_name())
}

/// Direction of travel relative to the work schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Home to work
    Outbound,
    /// Work to home
    Return,
}

impl Direction {
    /// Minutes of travel per kilometre.
    pub fn minutes_per_km(self) -> f64 {
        match self {
            Direction::Outbound => 2.5,
            Direction::Return => 2.8,
        }
    }

    /// Base duration when neither history nor addresses are available.
    pub fn default_minutes(self) -> u32 {
        match self {
            Direction::Outbound => 35,
            Direction::Return => 38,
        }
    }
}

/// Directional origin → destination pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    pub origin: String,
    pub destination: String,
    pub direction: Direction,
}

impl RouteKey {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>, direction: Direction) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            direction,
        }
    }

    /// Key used in the persisted history map.
    pub fn storage_key(&self) -> String {
        format!("{}->{}", self.origin, self.destination)
    }
}

/// The two ends of a daily commute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommuteRoute {
    pub home: LocationDescriptor,
    pub work: LocationDescriptor,
}

impl CommuteRoute {
    pub fn new(home: LocationDescriptor, work: LocationDescriptor) -> Self {
        Self { home, work }
    }

    pub fn key(&self, direction: Direction) -> RouteKey {
        let (from, to) = self.endpoints(direction);
        RouteKey::new(from.text(), to.text(), direction)
    }

    pub fn endpoints(&self, direction: Direction) -> (&LocationDescriptor, &LocationDescriptor) {
        match direction {
            Direction::Outbound => (&self.home, &self.work),
            Direction::Return => (&self.work, &self.home),
        }
    }

    /// Endpoints usable by the distance heuristic, if both are addresses.
    pub fn geographic_endpoints(
        &self,
        direction: Direction,
    ) -> Option<(&LocationDescriptor, &LocationDescriptor)> {
        let (from, to) = self.endpoints(direction);
        (from.is_geographic() && to.is_geographic()).then_some((from, to))
    }

    pub fn name(&self, direction: Direction) -> String {
        let (from, to) = self.endpoints(direction);
        route_name(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> LocationDescriptor {
        LocationDescriptor::address("Avenida Franz Voegeli, 924, Parque Continental, São Paulo, SP")
    }

    fn work() -> LocationDescriptor {
        LocationDescriptor::address("Avenida Paulista, 1000, São Paulo, SP")
    }

    #[test]
    fn central_keyword_detection_is_case_insensitive() {
        let g = Gazetteer::default();
        assert!(work().is_central(&g));
        assert!(!home().is_central(&g));
        assert!(LocationDescriptor::address("RUA X, PINHEIROS").is_central(&g));
    }

    #[test]
    fn labels_carry_no_geography() {
        let g = Gazetteer::default();
        let label = LocationDescriptor::label("centro");
        assert!(!label.is_central(&g));
        assert!(label.city_key(&g).is_none());
        assert!(!g.shares_city(&label, &label));
        assert!(!label.is_geographic());
    }

    #[test]
    fn shared_city_compares_city_keys() {
        let g = Gazetteer::default();
        assert_eq!(home().city_key(&g).as_deref(), Some("são paulo"));
        assert!(g.shares_city(&home(), &work()));

        let rio = LocationDescriptor::address("Rua do Ouvidor, Rio de Janeiro");
        assert_eq!(rio.city_key(&g).as_deref(), Some("rio de janeiro"));
        assert!(!g.shares_city(&rio, &work()));

        // Keys are the first listed match, so a bare state code is its own key
        let sp = LocationDescriptor::address("Rua B, SP");
        assert_eq!(sp.city_key(&g).as_deref(), Some("sp"));
        assert!(!g.shares_city(&sp, &work()));
    }

    #[test]
    fn custom_gazetteer_replaces_defaults() {
        let g = Gazetteer {
            cities: vec!["lisboa".into()],
            central_keywords: vec!["baixa".into()],
        };
        let a = LocationDescriptor::address("Rua Augusta, Baixa, Lisboa");
        let b = LocationDescriptor::address("Avenida da Liberdade, Lisboa");
        assert!(g.shares_city(&a, &b));
        assert!(a.is_central(&g));
        assert!(!b.is_central(&g));
    }

    #[test]
    fn route_keys_are_directional() {
        let route = CommuteRoute::new(home(), work());
        let out = route.key(Direction::Outbound);
        let back = route.key(Direction::Return);
        assert_ne!(out, back);
        assert_eq!(out.origin, back.destination);
        assert_ne!(out.storage_key(), back.storage_key());
    }

    #[test]
    fn short_names_truncate_long_streets() {
        assert_eq!(home().short_name(), "Avenida Franz Voegeli");
        let long = LocationDescriptor::address("Avenida Brigadeiro Faria Lima Extended Section, 1");
        assert_eq!(long.short_name(), "Avenida Brigadeiro Faria ...");
        assert_eq!(
            CommuteRoute::new(home(), work()).name(Direction::Return),
            "Via Avenida Paulista → Avenida Franz Voegeli"
        );
    }
}
