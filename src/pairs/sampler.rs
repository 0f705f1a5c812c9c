//! Pair sampler over an already-partitioned session pool.
//!
//! Each draw yields one genuine and one impostor pair, or nothing at all, so the
//! two classes stay balanced. Draws that cannot be completed are counted, not retried.

use super::{Pair, PairLabel, SelfPairPolicy};
use crate::session::{FramedSession, SessionKey, SessionPool};
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

type Entry<'a> = (&'a SessionKey, &'a FramedSession);

/// Outcome of a sampling run. A non-zero shortfall means training saw fewer pairs than asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleReport {
    pub requested: usize,
    pub genuine: usize,
    pub impostor: usize,
    pub self_pairs: usize,
    /// Draws skipped because the chosen user had a single session
    pub skipped_single_session: usize,
    /// Draws skipped because the pool has fewer than two users
    pub skipped_single_user: usize,
}

impl SampleReport {
    /// Draws that did not produce a pair.
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.genuine.min(self.impostor))
    }

    pub fn total(&self) -> usize {
        self.genuine + self.impostor
    }
}

pub struct PairSampler<'a> {
    users: Vec<&'a str>,
    by_user: BTreeMap<&'a str, Vec<Entry<'a>>>,
    policy: SelfPairPolicy,
}

impl<'a> PairSampler<'a> {
    pub fn new(pool: &'a SessionPool, policy: SelfPairPolicy) -> Self {
        let mut by_user: BTreeMap<&'a str, Vec<Entry<'a>>> = BTreeMap::new();
        for (key, framed) in pool {
            by_user.entry(key.user.as_str()).or_default().push((key, framed));
        }
        let users = by_user.keys().copied().collect();
        Self {
            users,
            by_user,
            policy,
        }
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Users that can produce a genuine pair of two distinct sessions.
    pub fn multi_session_users(&self) -> usize {
        self.by_user.values().filter(|s| s.len() >= 2).count()
    }

    pub fn policy(&self) -> SelfPairPolicy {
        self.policy
    }

    /// Draw `draws` units with a fresh `StdRng` seeded from `seed`.
    pub fn sample_seeded(&self, draws: usize, seed: u64) -> (Vec<Pair<'a>>, SampleReport) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.sample(draws, &mut rng)
    }

    pub fn sample<R: Rng + ?Sized>(&self, draws: usize, rng: &mut R) -> (Vec<Pair<'a>>, SampleReport) {
        let mut report = SampleReport {
            requested: draws,
            ..SampleReport::default()
        };
        let mut pairs = Vec::with_capacity(draws * 2);

        for _ in 0..draws {
            if self.users.len() < 2 {
                report.skipped_single_user += 1;
                continue;
            }
            let Some(genuine) = self.draw_genuine(rng) else {
                report.skipped_single_session += 1;
                continue;
            };
            let impostor = self.draw_impostor(rng);

            if genuine.is_self_pair() {
                report.self_pairs += 1;
            }
            report.genuine += 1;
            report.impostor += 1;
            pairs.push(genuine);
            pairs.push(impostor);
        }

        if report.shortfall() > 0 {
            tracing::warn!(
                requested = report.requested,
                yielded = report.total(),
                skipped_single_session = report.skipped_single_session,
                skipped_single_user = report.skipped_single_user,
                "pair sampling shortfall"
            );
        }
        (pairs, report)
    }

    fn draw_genuine<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Pair<'a>> {
        let user = *self.users.choose(rng)?;
        let sessions = self.by_user.get(user)?;
        let (a, b) = match self.policy {
            SelfPairPolicy::Always => {
                let s = *sessions.choose(rng)?;
                (s, s)
            }
            _ if sessions.len() >= 2 => {
                let idx = index::sample(rng, sessions.len(), 2);
                (sessions[idx.index(0)], sessions[idx.index(1)])
            }
            SelfPairPolicy::Singletons => (*sessions.first()?, *sessions.first()?),
            SelfPairPolicy::Disallow => return None,
        };
        Some(Pair {
            left_key: a.0,
            left: a.1,
            right_key: b.0,
            right: b.1,
            label: PairLabel::Genuine,
        })
    }

    fn draw_impostor<R: Rng + ?Sized>(&self, rng: &mut R) -> Pair<'a> {
        let idx = index::sample(rng, self.users.len(), 2);
        let pick = |u: usize, rng: &mut R| -> Entry<'a> {
            let sessions = &self.by_user[self.users[u]];
            sessions[rng.gen_range(0..sessions.len())]
        };
        let a = pick(idx.index(0), rng);
        let b = pick(idx.index(1), rng);
        Pair {
            left_key: a.0,
            left: a.1,
            right_key: b.0,
            right: b.1,
            label: PairLabel::Impostor,
        }
    }
}
