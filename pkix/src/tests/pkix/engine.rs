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

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{
    pkix::{
        BasicX509CredentialNameEvaluator, CertPathPkixTrustEvaluator, PkixTrustEvaluator,
        PkixValidationInformation, PkixValidationInformationResolver, PkixValidationOptions,
        PkixX509CredentialTrustEngine, StaticPkixValidationInformationResolver, TrustedNames,
        X509CredentialNameEvaluator,
    },
    tests::test_utils::{certs, credential, FOO_1A1_GOOD, ROOT3_CA, SP_3_GOOD},
    x500::{InternalX500DnHandler, X500DnHandler},
    CriteriaSet, Error, Result, X509Credential,
};

#[derive(Clone, Copy, Debug)]
enum Outcome {
    Trusted,
    Untrusted,
    Recoverable,
    Fatal,
}

/// Resolver that hands out one bundle per outcome. Each bundle's depth
/// records its index so the spy evaluator can find its outcome.
struct SpyResolver {
    bundles: usize,
    trusted_names: Option<TrustedNames>,
    fail: bool,
    resolve_calls: Arc<AtomicUsize>,
}

impl SpyResolver {
    fn new(bundles: usize, trusted_names: Option<&[&str]>) -> Self {
        Self {
            bundles,
            trusted_names: trusted_names
                .map(|names| names.iter().map(|n| n.to_string()).collect()),
            fail: false,
            resolve_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl PkixValidationInformationResolver for SpyResolver {
    fn resolve(&self, _criteria: &CriteriaSet) -> Result<Vec<PkixValidationInformation>> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::InvalidCertificate("unreadable metadata".into()));
        }

        Ok((0..self.bundles)
            .map(|i| PkixValidationInformation::new(vec![], vec![], Some(i as i32)))
            .collect())
    }

    fn resolve_trusted_names(&self, _criteria: &CriteriaSet) -> Result<TrustedNames> {
        if self.fail {
            return Err(Error::ResolutionFailed("names unavailable".into()));
        }
        Ok(self.trusted_names.clone().unwrap_or_default())
    }

    fn supports_trusted_name_resolution(&self) -> bool {
        self.trusted_names.is_some()
    }
}

struct SpyEvaluator {
    outcomes: Vec<Outcome>,
    calls: Arc<AtomicUsize>,
    options: PkixValidationOptions,
    handler: InternalX500DnHandler,
}

impl SpyEvaluator {
    fn new(outcomes: &[Outcome]) -> Self {
        Self {
            outcomes: outcomes.to_vec(),
            calls: Arc::new(AtomicUsize::new(0)),
            options: PkixValidationOptions::default(),
            handler: InternalX500DnHandler,
        }
    }
}

impl PkixTrustEvaluator for SpyEvaluator {
    fn validate(
        &self,
        info: &PkixValidationInformation,
        _credential: &X509Credential,
    ) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let index = info.verification_depth().unwrap_or_default() as usize;
        match self.outcomes.get(index).copied().unwrap_or(Outcome::Untrusted) {
            Outcome::Trusted => Ok(true),
            Outcome::Untrusted => Ok(false),
            Outcome::Recoverable => Err(Error::NoTrustAnchors),
            Outcome::Fatal => Err(Error::CryptoLibraryError("provider failure".into())),
        }
    }

    fn pkix_validation_options(&self) -> &PkixValidationOptions {
        &self.options
    }

    fn x500_dn_handler(&self) -> &dyn X500DnHandler {
        &self.handler
    }
}

/// Builds an engine over the spies, returning the resolver and evaluator
/// call counters.
fn spy_engine(
    resolver: SpyResolver,
    outcomes: &[Outcome],
    name_evaluator: Option<Box<dyn X509CredentialNameEvaluator>>,
) -> (PkixX509CredentialTrustEngine, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let resolve_calls = resolver.resolve_calls.clone();
    let evaluator = SpyEvaluator::new(outcomes);
    let calls = evaluator.calls.clone();

    (
        PkixX509CredentialTrustEngine::with_evaluators(
            Box::new(resolver),
            Box::new(evaluator),
            name_evaluator,
        ),
        resolve_calls,
        calls,
    )
}

fn basic_name_evaluator() -> Option<Box<dyn X509CredentialNameEvaluator>> {
    Some(Box::new(BasicX509CredentialNameEvaluator::new()))
}

#[test]
fn impl_debug() {
    let (engine, _, _) = spy_engine(SpyResolver::new(0, None), &[], None);
    let _ = format!("{engine:#?}");
}

#[test]
fn accessors() {
    let resolver = StaticPkixValidationInformationResolver::default();
    let engine = PkixX509CredentialTrustEngine::new(Box::new(resolver));

    assert!(engine.resolver().supports_trusted_name_resolution());
    assert!(engine.name_evaluator().is_some());
    assert_eq!(
        engine.pkix_trust_evaluator().pkix_validation_options(),
        &PkixValidationOptions::default()
    );

    let engine = PkixX509CredentialTrustEngine::with_name_evaluator(
        Box::new(StaticPkixValidationInformationResolver::default()),
        None,
    );
    assert!(engine.name_evaluator().is_none());
}

#[test]
fn name_check_failure_skips_path_evaluation() {
    let (engine, resolve_calls, calls) = spy_engine(
        SpyResolver::new(3, Some(&["no.such.name"])),
        &[Outcome::Trusted, Outcome::Trusted, Outcome::Trusted],
        basic_name_evaluator(),
    );

    assert!(!engine
        .validate(&credential(SP_3_GOOD), &CriteriaSet::new())
        .unwrap());
    assert_eq!(resolve_calls.load(Ordering::SeqCst), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn empty_trusted_names_fail_name_check() {
    let (engine, _, calls) = spy_engine(
        SpyResolver::new(1, Some(&[])),
        &[Outcome::Trusted],
        basic_name_evaluator(),
    );

    assert!(!engine
        .validate(&credential(SP_3_GOOD), &CriteriaSet::new())
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn first_success_wins() {
    let (engine, _, calls) = spy_engine(
        SpyResolver::new(3, Some(&["sp.example.org"])),
        &[Outcome::Untrusted, Outcome::Trusted, Outcome::Trusted],
        basic_name_evaluator(),
    );

    assert!(engine
        .validate(&credential(SP_3_GOOD), &CriteriaSet::new())
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn no_bundle_succeeds() {
    let (engine, _, calls) = spy_engine(
        SpyResolver::new(3, Some(&["sp.example.org"])),
        &[Outcome::Untrusted, Outcome::Untrusted, Outcome::Untrusted],
        basic_name_evaluator(),
    );

    assert!(!engine
        .validate(&credential(SP_3_GOOD), &CriteriaSet::new())
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn no_bundles() {
    let (engine, resolve_calls, calls) = spy_engine(
        SpyResolver::new(0, Some(&["sp.example.org"])),
        &[],
        basic_name_evaluator(),
    );

    assert!(!engine
        .validate(&credential(SP_3_GOOD), &CriteriaSet::new())
        .unwrap());
    assert_eq!(resolve_calls.load(Ordering::SeqCst), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn unsupported_trusted_names_skip_name_check() {
    let (engine, _, calls) = spy_engine(
        SpyResolver::new(2, None),
        &[Outcome::Untrusted, Outcome::Trusted],
        basic_name_evaluator(),
    );

    assert!(engine
        .validate(&credential(FOO_1A1_GOOD), &CriteriaSet::new())
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn no_name_evaluator() {
    let (engine, _, calls) = spy_engine(
        SpyResolver::new(1, Some(&["no.such.name"])),
        &[Outcome::Trusted],
        None,
    );

    assert!(engine
        .validate(&credential(FOO_1A1_GOOD), &CriteriaSet::new())
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn recoverable_error_skips_bundle() {
    let (engine, _, calls) = spy_engine(
        SpyResolver::new(3, None),
        &[Outcome::Recoverable, Outcome::Trusted, Outcome::Trusted],
        None,
    );

    assert!(engine
        .validate(&credential(SP_3_GOOD), &CriteriaSet::new())
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn recoverable_errors_only() {
    let (engine, _, calls) = spy_engine(
        SpyResolver::new(2, None),
        &[Outcome::Recoverable, Outcome::Recoverable],
        None,
    );

    assert!(!engine
        .validate(&credential(SP_3_GOOD), &CriteriaSet::new())
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn fatal_error_aborts() {
    let (engine, _, calls) = spy_engine(
        SpyResolver::new(3, None),
        &[Outcome::Untrusted, Outcome::Fatal, Outcome::Trusted],
        None,
    );

    assert!(matches!(
        engine.validate(&credential(SP_3_GOOD), &CriteriaSet::new()),
        Err(Error::CryptoLibraryError(_))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn resolver_errors_are_fatal() {
    let mut resolver = SpyResolver::new(1, None);
    resolver.fail = true;
    let (engine, _, calls) = spy_engine(resolver, &[Outcome::Trusted], None);

    assert!(matches!(
        engine.validate(&credential(SP_3_GOOD), &CriteriaSet::new()),
        Err(Error::ResolutionFailed(_))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let mut resolver = SpyResolver::new(1, Some(&["sp.example.org"]));
    resolver.fail = true;
    let (engine, resolve_calls, _) =
        spy_engine(resolver, &[Outcome::Trusted], basic_name_evaluator());

    assert_eq!(
        engine.validate(&credential(SP_3_GOOD), &CriteriaSet::new()),
        Err(Error::ResolutionFailed("names unavailable".into()))
    );
    assert_eq!(resolve_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn example_scenario() {
    let info = PkixValidationInformation::new(certs(&[ROOT3_CA]), vec![], None);
    let trusted_names: TrustedNames = ["sp.example.org".to_string()].into_iter().collect();
    let cred = credential(SP_3_GOOD);

    assert!(BasicX509CredentialNameEvaluator::new()
        .evaluate(&cred, Some(&trusted_names))
        .unwrap());
    assert!(CertPathPkixTrustEvaluator::new()
        .validate(&info, &cred)
        .unwrap());

    let engine = PkixX509CredentialTrustEngine::new(Box::new(
        StaticPkixValidationInformationResolver::new(vec![info], trusted_names),
    ));
    assert!(engine.validate(&cred, &CriteriaSet::new()).unwrap());
}

#[test]
fn bundle_without_anchors_is_skipped() {
    let empty = PkixValidationInformation::new(vec![], vec![], None);
    let good = PkixValidationInformation::new(certs(&[ROOT3_CA]), vec![], None);
    let resolver = StaticPkixValidationInformationResolver::new(
        vec![empty, good],
        ["sp.example.org".to_string()].into_iter().collect(),
    );

    let engine = PkixX509CredentialTrustEngine::new(Box::new(resolver));
    assert!(engine
        .validate(&credential(SP_3_GOOD), &CriteriaSet::new())
        .unwrap());
}
