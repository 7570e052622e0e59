// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Offline checks that every configured sample decodes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::AmbientTrack;
use crate::instrument::{Catalog, InstrumentProfile};
use crate::sampler::{SampleLoader, VoiceRequest};

/// A sample that failed to decode.
#[derive(Debug, Clone)]
pub struct Issue {
    /// The instrument or ambient track the sample belongs to.
    pub owner: String,
    pub note: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.owner, self.note, self.message)
    }
}

/// Result of verifying a set of samples.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    /// The number of samples checked.
    pub checked: usize,
    pub issues: Vec<Issue>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: VerificationReport) {
        self.checked += other.checked;
        self.issues.extend(other.issues);
    }
}

fn check_samples(
    owner: &str,
    samples: &BTreeMap<String, PathBuf>,
    loader: &SampleLoader,
) -> VerificationReport {
    let mut report = VerificationReport {
        checked: samples.len(),
        issues: Vec::new(),
    };
    for (note, result) in loader.load_all(samples) {
        if let Err(e) = result {
            report.issues.push(Issue {
                owner: owner.to_string(),
                note,
                message: e.to_string(),
            });
        }
    }
    report
}

/// Decodes every sample of an instrument.
pub fn check_instrument(
    profile: &InstrumentProfile,
    loader: &SampleLoader,
    assets: &Path,
) -> VerificationReport {
    let request = VoiceRequest::for_instrument(profile, assets, 1.0);
    check_samples(profile.name(), &request.samples, loader)
}

/// Decodes every sample of every instrument in the catalog.
pub fn check_catalog(catalog: &Catalog, loader: &SampleLoader, assets: &Path) -> VerificationReport {
    let mut report = VerificationReport::default();
    for profile in catalog.iter() {
        report.merge(check_instrument(profile, loader, assets));
    }
    report
}

/// Decodes every ambient track's sample.
pub fn check_ambience(
    tracks: &[AmbientTrack],
    loader: &SampleLoader,
    assets: &Path,
) -> VerificationReport {
    let mut report = VerificationReport::default();
    for track in tracks {
        let samples = BTreeMap::from([(track.note().to_string(), assets.join(track.sample()))]);
        report.merge(check_samples(track.name(), &samples, loader));
    }
    report
}
