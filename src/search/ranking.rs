//! Ordering of aggregated offers

use crate::offers::{Offer, SortField, SortOrder};
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// How an aggregated list is ordered
#[derive(Debug, Clone, PartialEq)]
pub enum Ranking {
    /// Stable sort on one offer field
    Field(SortField, SortOrder),
    /// Best keyword matches first
    Relevance(Vec<String>),
    /// Interleave upstreams so no single one dominates the top
    RoundRobin,
}

impl Ranking {
    /// Pick a strategy from the raw request values.
    ///
    /// Unknown `sort_by` values are treated like an empty one.
    pub fn select(sort_by: &str, sort_order: &str, keyword: &str) -> Self {
        if let Some(field) = SortField::parse(sort_by) {
            return Self::Field(field, SortOrder::parse(sort_order));
        }
        let tokens = tokenize(keyword);
        if tokens.is_empty() {
            Self::RoundRobin
        } else {
            Self::Relevance(tokens)
        }
    }

    /// Reorder offers in place
    pub fn apply<R: Rng + ?Sized>(&self, offers: &mut Vec<Offer>, rng: &mut R) {
        match self {
            Self::Field(field, order) => sort_by_field(offers, *field, *order),
            Self::Relevance(tokens) => sort_by_relevance(offers, tokens, rng),
            Self::RoundRobin => round_robin(offers, rng),
        }
    }
}

/// Lowercased distinct keyword tokens in phrase order
fn tokenize(keyword: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    keyword
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

fn compare(a: &Offer, b: &Offer, field: SortField) -> Ordering {
    match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Name => a.name.cmp(&b.name),
        SortField::Price => a.price.total_cmp(&b.price),
        SortField::Rating => a.rating.total_cmp(&b.rating),
        SortField::NumReviews => a.num_reviews.cmp(&b.num_reviews),
    }
}

/// Stable sort on a single field
pub fn sort_by_field(offers: &mut [Offer], field: SortField, order: SortOrder) {
    match order {
        SortOrder::Asc => offers.sort_by(|a, b| compare(a, b, field)),
        SortOrder::Desc => offers.sort_by(|a, b| compare(b, a, field)),
    }
}

/// Keyword match statistics of one offer name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MatchScore {
    /// Distinct tokens found in the name
    num_keywords: usize,
    /// Smallest character offset of any match, -1 without matches
    lowest_index: i64,
    /// Occurrences of all tokens
    total_matches: usize,
}

impl MatchScore {
    fn of(name: &str, tokens: &[String]) -> Self {
        let name = name.to_lowercase();
        let mut score = Self {
            num_keywords: 0,
            lowest_index: -1,
            total_matches: 0,
        };

        for token in tokens {
            let Some(byte_index) = name.find(token.as_str()) else {
                continue;
            };
            let index = name[..byte_index].chars().count() as i64;
            score.num_keywords += 1;
            score.total_matches += name.matches(token.as_str()).count();
            if score.lowest_index < 0 || index < score.lowest_index {
                score.lowest_index = index;
            }
        }
        score
    }

    /// Better scores order first
    fn rank(&self, other: &Self) -> Ordering {
        other
            .num_keywords
            .cmp(&self.num_keywords)
            .then(self.lowest_index.cmp(&other.lowest_index))
            .then(other.total_matches.cmp(&self.total_matches))
    }
}

/// Shuffle, then order by keyword matches so ties land in random order
pub fn sort_by_relevance<R: Rng + ?Sized>(offers: &mut Vec<Offer>, tokens: &[String], rng: &mut R) {
    offers.shuffle(rng);

    let mut scored: Vec<(MatchScore, Offer)> = offers
        .drain(..)
        .map(|offer| (MatchScore::of(&offer.name, tokens), offer))
        .collect();
    scored.sort_by(|(a, _), (b, _)| a.rank(b));

    offers.extend(scored.into_iter().map(|(_, offer)| offer));
}

/// Interleave offers by upstream.
///
/// Each upstream's offers are shuffled. Offers are then drawn one at a time
/// from a randomly chosen upstream of the current draw set, which removes it
/// from the set; once every upstream has been drawn from the set is refilled
/// with those that still have offers.
pub fn round_robin<R: Rng + ?Sized>(offers: &mut Vec<Offer>, rng: &mut R) {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<Offer>> = HashMap::new();
    for offer in offers.drain(..) {
        if !buckets.contains_key(&offer.party_name) {
            order.push(offer.party_name.clone());
        }
        buckets.entry(offer.party_name.clone()).or_default().push(offer);
    }
    let mut buckets: Vec<Vec<Offer>> = order
        .iter()
        .filter_map(|name| buckets.remove(name))
        .collect();
    for bucket in &mut buckets {
        bucket.shuffle(rng);
    }

    let mut draw_set: Vec<usize> = Vec::new();
    loop {
        if draw_set.is_empty() {
            draw_set = (0..buckets.len()).filter(|&i| !buckets[i].is_empty()).collect();
            if draw_set.is_empty() {
                break;
            }
        }
        let pick = draw_set.swap_remove(rng.gen_range(0..draw_set.len()));
        if let Some(offer) = buckets[pick].pop() {
            offers.push(offer);
        }
    }
}
