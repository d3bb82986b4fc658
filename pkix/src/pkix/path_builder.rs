// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Certification path construction.
//!
//! Candidate paths are found by depth-first search with backtracking from the
//! target towards the trust anchors. Each complete candidate is then
//! validated; the first one that passes is returned.

use std::collections::HashMap;

use log::{debug, trace};
use x509_parser::error::X509Error;

use super::{
    cert_store::{PathCertificate, StoredCrl},
    name_constraints::check_name_constraints,
    policy::{process_policies, PolicyParameters},
    revocation::{check_revocation, RevocationStatus},
};
use crate::{Error, Result};

/// Upper bound on path length, regardless of the configured depth.
const MAX_CHAIN_DEPTH: usize = 32;

/// Upper bound on the number of partial paths explored for one target. The
/// chain comes from the credential, so the search must stay bounded however
/// many ways its certificates can be ordered.
const MAX_SEARCH_STEPS: usize = 1024;

/// Extensions that path validation knows how to process. A certificate
/// carrying any other critical extension is rejected.
const SUPPORTED_CRITICAL_EXTENSIONS: &[&str] = &[
    "2.5.29.14", // subjectKeyIdentifier
    "2.5.29.15", // keyUsage
    "2.5.29.17", // subjectAltName
    "2.5.29.19", // basicConstraints
    "2.5.29.30", // nameConstraints
    "2.5.29.32", // certificatePolicies
    "2.5.29.33", // policyMappings
    "2.5.29.35", // authorityKeyIdentifier
    "2.5.29.36", // policyConstraints
    "2.5.29.37", // extKeyUsage
    "2.5.29.54", // inhibitAnyPolicy
];

/// Inputs to path construction and validation.
#[derive(Clone, Debug)]
pub(crate) struct PathParameters {
    /// Maximum number of non-self-issued intermediates. Negative means no
    /// limit.
    pub(crate) max_path_length: i32,
    pub(crate) revocation_enabled: bool,
    pub(crate) policy: PolicyParameters,
    pub(crate) now: i64,
}

/// A validated path. `certificates` runs from the target up to, but not
/// including, the trust anchor.
pub(crate) struct BuiltPath<'s, 'a> {
    pub(crate) certificates: Vec<&'s PathCertificate<'a>>,
    pub(crate) anchor: &'s PathCertificate<'a>,
}

pub(crate) enum BuildOutcome<'s, 'a> {
    Built(BuiltPath<'s, 'a>),

    /// No valid path exists. Holds the reason the last candidate was
    /// rejected.
    NotBuilt(String),
}

enum CandidateError {
    Rejected(String),
    Fatal(Error),
}

impl From<Error> for CandidateError {
    fn from(err: Error) -> Self {
        Self::Fatal(err)
    }
}

/// Build a path from `target` to one of `anchors`, using `intermediates` as
/// the pool of untrusted certificates.
pub(crate) fn build_path<'s, 'a>(
    target: &'s PathCertificate<'a>,
    anchors: &'s [PathCertificate<'a>],
    intermediates: &'s [PathCertificate<'a>],
    crls: &'s [StoredCrl<'a>],
    params: &PathParameters,
) -> Result<BuildOutcome<'s, 'a>> {
    if let Some(anchor) = anchors.iter().find(|a| a.der == target.der) {
        trace!("target certificate is itself a trust anchor");
        return Ok(BuildOutcome::Built(BuiltPath {
            certificates: vec![],
            anchor,
        }));
    }

    let mut search = Search {
        target,
        anchors,
        intermediates,
        crls,
        params,
        signatures: HashMap::new(),
        steps: 0,
        budget_exceeded: false,
        last_rejection: None,
    };

    let mut path = vec![(Slot::Target, target)];
    let mut used = vec![false; intermediates.len()];

    let built = search.extend(&mut path, &mut used)?;

    Ok(match built {
        Some(built) => BuildOutcome::Built(built),
        None if search.budget_exceeded => {
            BuildOutcome::NotBuilt("path building budget exceeded".to_string())
        }
        None => BuildOutcome::NotBuilt(search.last_rejection.unwrap_or_else(|| {
            "no certification path to a trust anchor could be found".to_string()
        })),
    })
}

/// Identifies a certificate by where it came from, so signature checks can be
/// cached across candidate paths.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum Slot {
    Target,
    Anchor(usize),
    Intermediate(usize),
}

type PathEntry<'s, 'a> = (Slot, &'s PathCertificate<'a>);

struct Search<'s, 'a, 'p> {
    target: &'s PathCertificate<'a>,
    anchors: &'s [PathCertificate<'a>],
    intermediates: &'s [PathCertificate<'a>],
    crls: &'s [StoredCrl<'a>],
    params: &'p PathParameters,

    /// Outcome of each (child, issuer) signature check made so far.
    signatures: HashMap<(Slot, Slot), bool>,

    /// Number of partial paths extended so far.
    steps: usize,
    budget_exceeded: bool,

    last_rejection: Option<String>,
}

impl<'s, 'a> Search<'s, 'a, '_> {
    fn extend(
        &mut self,
        path: &mut Vec<PathEntry<'s, 'a>>,
        used: &mut [bool],
    ) -> Result<Option<BuiltPath<'s, 'a>>> {
        let Some((current_slot, current)) = path.last().copied() else {
            return Ok(None);
        };

        self.steps += 1;
        if self.steps > MAX_SEARCH_STEPS {
            if !self.budget_exceeded {
                debug!("abandoning path building after {MAX_SEARCH_STEPS} steps");
                self.budget_exceeded = true;
            }
            return Ok(None);
        }

        if self.exceeds_max_path_length(path) {
            self.reject("maximum path length exceeded".to_string());
            return Ok(None);
        }

        let anchors = self.anchors;
        for (idx, anchor) in anchors.iter().enumerate() {
            if anchor.subject != current.issuer
                || !self.signed_by(current_slot, current, Slot::Anchor(idx), anchor)?
            {
                continue;
            }

            let certificates: Vec<&'s PathCertificate<'a>> =
                path.iter().map(|(_, cert)| *cert).collect();

            match self.validate_candidate(&certificates, anchor) {
                Ok(()) => {
                    return Ok(Some(BuiltPath {
                        certificates,
                        anchor,
                    }))
                }
                Err(CandidateError::Rejected(reason)) => self.reject(reason),
                Err(CandidateError::Fatal(err)) => return Err(err),
            }
        }

        if path.len() >= MAX_CHAIN_DEPTH {
            return Ok(None);
        }

        let intermediates = self.intermediates;
        for (idx, candidate) in intermediates.iter().enumerate() {
            if used.get(idx).copied().unwrap_or(true)
                || candidate.subject != current.issuer
                || candidate.der == self.target.der
                || path.iter().any(|(_, p)| p.der == candidate.der)
            {
                continue;
            }

            let slot = Slot::Intermediate(idx);
            if !self.signed_by(current_slot, current, slot, candidate)? {
                continue;
            }

            set_used(used, idx, true);
            path.push((slot, candidate));

            if let Some(built) = self.extend(path, used)? {
                return Ok(Some(built));
            }

            path.pop();
            set_used(used, idx, false);

            if self.budget_exceeded {
                return Ok(None);
            }
        }

        Ok(None)
    }

    fn signed_by(
        &mut self,
        child_slot: Slot,
        child: &PathCertificate,
        issuer_slot: Slot,
        issuer: &PathCertificate,
    ) -> Result<bool> {
        if let Some(signed) = self.signatures.get(&(child_slot, issuer_slot)) {
            return Ok(*signed);
        }

        let signed = signed_by(child, issuer)?;
        self.signatures.insert((child_slot, issuer_slot), signed);
        Ok(signed)
    }

    fn reject(&mut self, reason: String) {
        trace!("rejected candidate certification path: {reason}");
        self.last_rejection = Some(reason);
    }

    fn exceeds_max_path_length(&self, path: &[PathEntry]) -> bool {
        let Ok(max) = usize::try_from(self.params.max_path_length) else {
            return false;
        };
        path.iter()
            .skip(1)
            .filter(|(_, cert)| !cert.is_self_issued())
            .count()
            > max
    }

    /// Validate a complete candidate path (target first) ending at `anchor`.
    fn validate_candidate(
        &self,
        path: &[&'s PathCertificate<'a>],
        anchor: &'s PathCertificate<'a>,
    ) -> std::result::Result<(), CandidateError> {
        let now = self.params.now;

        // Processing order: from the certificate issued by the anchor down to
        // the target.
        let processing: Vec<&PathCertificate> = path.iter().rev().copied().collect();
        let (target, intermediates) = match processing.split_last() {
            Some((target, intermediates)) => (*target, intermediates),
            None => return Err(CandidateError::Rejected("empty path".to_string())),
        };

        for cert in &processing {
            check_validity(cert, now)?;
            check_critical_extensions(cert)?;
        }

        check_basic_constraints(intermediates, self.params.max_path_length)?;

        for (i, ca) in intermediates.iter().enumerate() {
            let nc = match ca.cert.name_constraints() {
                Ok(Some(nc)) => nc,
                Ok(None) => continue,
                Err(e) => return Err(rejected(ca, &format!("invalid name constraints: {e}"))),
            };

            for (j, below) in processing.iter().enumerate().skip(i + 1) {
                let is_target = j + 1 == processing.len();
                if below.is_self_issued() && !is_target {
                    continue;
                }
                check_name_constraints(nc.value, below).map_err(|e| rejected(below, &e))?;
            }
        }

        process_policies(&processing, &self.params.policy)
            .map_err(|e| rejected(target, &e))?;

        if self.params.revocation_enabled {
            for (k, cert) in path.iter().enumerate() {
                let issuer = path.get(k + 1).copied().unwrap_or(anchor);
                match check_revocation(cert, issuer, self.crls, now)? {
                    RevocationStatus::Good => {}
                    RevocationStatus::Revoked => {
                        return Err(rejected(cert, "certificate has been revoked"))
                    }
                    RevocationStatus::Undetermined => {
                        return Err(rejected(cert, "could not determine revocation status"))
                    }
                }
            }
        }

        Ok(())
    }
}

fn set_used(used: &mut [bool], idx: usize, value: bool) {
    if let Some(slot) = used.get_mut(idx) {
        *slot = value;
    }
}

fn rejected(cert: &PathCertificate, reason: &str) -> CandidateError {
    CandidateError::Rejected(format!("{reason} ({})", cert.subject))
}

/// Return `true` if `child`'s signature verifies under `issuer`'s public key.
///
/// A signature that doesn't verify, or an algorithm that can't be used with
/// the issuer's key, simply means `issuer` didn't sign `child`. Any other
/// failure is an error.
fn signed_by(child: &PathCertificate, issuer: &PathCertificate) -> Result<bool> {
    match child.cert.verify_signature(Some(issuer.cert.public_key())) {
        Ok(()) => Ok(true),
        Err(X509Error::SignatureVerificationError | X509Error::SignatureUnsupportedAlgorithm) => {
            Ok(false)
        }
        Err(e) => Err(Error::CryptoLibraryError(e.to_string())),
    }
}

fn check_validity(cert: &PathCertificate, now: i64) -> std::result::Result<(), CandidateError> {
    let validity = cert.cert.validity();
    if now < validity.not_before.timestamp() {
        return Err(rejected(cert, "certificate is not yet valid"));
    }
    if now > validity.not_after.timestamp() {
        return Err(rejected(cert, "certificate has expired"));
    }
    Ok(())
}

fn check_critical_extensions(cert: &PathCertificate) -> std::result::Result<(), CandidateError> {
    match cert.cert.extensions().iter().find(|ext| {
        ext.critical && !SUPPORTED_CRITICAL_EXTENSIONS.contains(&ext.oid.to_id_string().as_str())
    }) {
        Some(ext) => Err(rejected(
            cert,
            &format!("unsupported critical extension {}", ext.oid),
        )),
        None => Ok(()),
    }
}

/// Intermediates (in processing order) must be CAs entitled to sign
/// certificates, and the path must respect every length constraint.
fn check_basic_constraints(
    intermediates: &[&PathCertificate],
    max_path_length: i32,
) -> std::result::Result<(), CandidateError> {
    let mut remaining = usize::try_from(max_path_length).unwrap_or(usize::MAX);

    for ca in intermediates {
        let bc = match ca.cert.basic_constraints() {
            Ok(Some(bc)) if bc.value.ca => bc.value,
            Ok(_) => return Err(rejected(ca, "issuer is not a CA certificate")),
            Err(e) => return Err(rejected(ca, &format!("invalid basic constraints: {e}"))),
        };

        if !ca.is_self_issued() {
            if remaining == 0 {
                return Err(rejected(ca, "path length constraint exceeded"));
            }
            remaining -= 1;
        }

        if let Some(limit) = bc.path_len_constraint {
            remaining = remaining.min(limit as usize);
        }

        match ca.cert.key_usage() {
            Ok(Some(ku)) if !ku.value.key_cert_sign() => {
                return Err(rejected(ca, "key usage does not permit certificate signing"))
            }
            Ok(_) => {}
            Err(e) => return Err(rejected(ca, &format!("invalid key usage: {e}"))),
        }
    }

    Ok(())
}
