use super::BrandMatch;
use crate::domain_utils::DomainUtils;

/// Flags domains that sit within a small edit distance of a known brand
/// domain without being that domain ("paypa1.com" vs "paypal.com").
#[derive(Debug, Clone)]
pub struct BrandImpersonationAnalyzer {
    known_brands: Vec<String>,
    max_distance: usize,
}

impl BrandImpersonationAnalyzer {
    pub fn new(known_brands: &[String], max_distance: usize) -> Self {
        Self {
            known_brands: known_brands
                .iter()
                .map(|d| DomainUtils::canonicalize_domain(d.trim()))
                .filter(|d| !d.is_empty())
                .collect(),
            max_distance,
        }
    }

    /// Closest known brand and its distance; ties keep the earlier brand.
    pub fn closest_brand(&self, domain: &str) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for brand in &self.known_brands {
            let distance = DomainUtils::edit_distance(domain, brand);
            match best {
                Some((_, d)) if d <= distance => {}
                _ => best = Some((brand.as_str(), distance)),
            }
        }
        best
    }

    /// `None` when there is nothing to compare (empty candidate or no brands).
    pub fn check(&self, candidate: &str) -> Option<BrandMatch> {
        let candidate = DomainUtils::canonical_domain(candidate);
        if candidate.is_empty() {
            return None;
        }

        let (brand, distance) = self.closest_brand(&candidate)?;
        let is_known_brand = self.known_brands.iter().any(|b| *b == candidate);

        if distance <= self.max_distance && !is_known_brand {
            log::debug!(
                "Domain {} resembles brand {} (distance {})",
                candidate,
                brand,
                distance
            );
            Some(BrandMatch {
                flagged: true,
                matched_brand: Some(brand.to_string()),
                distance: Some(distance),
            })
        } else {
            Some(BrandMatch::default())
        }
    }
}
