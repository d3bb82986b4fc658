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

//! Certificate policy processing as described in [RFC 5280 section 6.1].
//!
//! The valid policy tree is stored level by level. Each node records the
//! index of its parent in the previous level.
//!
//! [RFC 5280 section 6.1]: https://datatracker.ietf.org/doc/html/rfc5280#section-6.1

use std::collections::{BTreeMap, BTreeSet};

use x509_parser::extensions::ParsedExtension;

use super::cert_store::PathCertificate;

pub(crate) const ANY_POLICY: &str = "2.5.29.32.0";

/// Policy-related inputs to path validation.
#[derive(Clone, Debug, Default)]
pub(crate) struct PolicyParameters {
    /// Empty means `anyPolicy`.
    pub(crate) initial_policies: BTreeSet<String>,
    pub(crate) explicit_policy_required: bool,
    pub(crate) policy_mapping_inhibited: bool,
    pub(crate) any_policy_inhibited: bool,
}

#[derive(Clone, Debug)]
struct Node {
    valid_policy: String,
    expected_policy_set: BTreeSet<String>,
    parent: Option<usize>,
}

impl Node {
    fn child(valid_policy: &str, expected: BTreeSet<String>, parent: usize) -> Self {
        Self {
            valid_policy: valid_policy.to_owned(),
            expected_policy_set: expected,
            parent: Some(parent),
        }
    }
}

#[derive(Debug)]
struct PolicyTree {
    levels: Vec<Vec<Node>>,
}

impl PolicyTree {
    fn new() -> Self {
        Self {
            levels: vec![vec![Node {
                valid_policy: ANY_POLICY.to_owned(),
                expected_policy_set: BTreeSet::from([ANY_POLICY.to_owned()]),
                parent: None,
            }]],
        }
    }

    fn is_empty(&self) -> bool {
        self.levels.first().map_or(true, Vec::is_empty)
    }

    fn depth(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Keep the nodes at `level` whose entry in `keep` is `true`. Descendants
    /// of removed nodes are removed too, and parent indices are renumbered.
    fn retain_mask(&mut self, level: usize, keep: Vec<bool>) {
        let mut level = level;
        let mut keep = keep;

        loop {
            let Some(nodes) = self.levels.get_mut(level) else {
                return;
            };

            let mut remap = Vec::with_capacity(nodes.len());
            let mut kept = 0;
            for i in 0..nodes.len() {
                if keep.get(i).copied().unwrap_or(false) {
                    remap.push(Some(kept));
                    kept += 1;
                } else {
                    remap.push(None);
                }
            }

            let mut i = 0;
            nodes.retain(|_| {
                let k = remap.get(i).is_some_and(Option::is_some);
                i += 1;
                k
            });

            let Some(children) = self.levels.get_mut(level + 1) else {
                return;
            };
            keep = children
                .iter_mut()
                .map(|child| match child.parent.and_then(|p| remap.get(p).copied().flatten()) {
                    Some(new_parent) => {
                        child.parent = Some(new_parent);
                        true
                    }
                    None => false,
                })
                .collect();
            level += 1;
        }
    }

    /// Delete every node above the deepest level that has no children.
    fn prune(&mut self) {
        for level in (0..self.depth()).rev() {
            let parents: BTreeSet<usize> = self
                .levels
                .get(level + 1)
                .map(|children| children.iter().filter_map(|n| n.parent).collect())
                .unwrap_or_default();
            let count = self.levels.get(level).map_or(0, Vec::len);
            let keep = (0..count).map(|i| parents.contains(&i)).collect();
            self.retain_mask(level, keep);
        }
    }
}

/// Run policy processing over `path`, ordered from the certificate issued by
/// the trust anchor down to the target.
pub(crate) fn process_policies(
    path: &[&PathCertificate],
    params: &PolicyParameters,
) -> Result<(), String> {
    let n = path.len();
    let mut explicit_policy = if params.explicit_policy_required { 0 } else { n + 1 };
    let mut inhibit_any_policy = if params.any_policy_inhibited { 0 } else { n + 1 };
    let mut policy_mapping = if params.policy_mapping_inhibited { 0 } else { n + 1 };

    let mut tree = Some(PolicyTree::new());

    for (index, cert) in path.iter().enumerate() {
        let i = index + 1;
        let is_target = i == n;
        let self_issued = cert.is_self_issued();
        let policies = certificate_policies(cert)?;

        // (d) Process the policy information of the certificate.
        let emptied = match (&policies, tree.as_mut()) {
            (Some(policies), Some(t)) => {
                let any_allowed = inhibit_any_policy > 0 || (!is_target && self_issued);
                add_level(t, policies, any_allowed);
                t.prune();
                t.is_empty()
            }
            // (e) No policies in this certificate: the tree is gone.
            (None, _) => true,
            (Some(_), None) => false,
        };
        if emptied {
            tree = None;
        }

        // (f)
        if explicit_policy == 0 && tree.is_none() {
            return Err(format!(
                "no acceptable policy at certificate {i} of the path"
            ));
        }

        if is_target {
            break;
        }

        // Preparation for the next certificate (RFC 5280 section 6.1.4).
        let mappings = policy_mappings(cert)?;
        if !mappings.is_empty() {
            if let Some(t) = tree.as_mut() {
                apply_mappings(t, &mappings, policy_mapping > 0);
                if t.is_empty() {
                    tree = None;
                }
            }
        }

        if !self_issued {
            explicit_policy = explicit_policy.saturating_sub(1);
            policy_mapping = policy_mapping.saturating_sub(1);
            inhibit_any_policy = inhibit_any_policy.saturating_sub(1);
        }

        let (require_explicit, inhibit_mapping) = policy_constraints(cert);
        if let Some(r) = require_explicit {
            explicit_policy = explicit_policy.min(r);
        }
        if let Some(q) = inhibit_mapping {
            policy_mapping = policy_mapping.min(q);
        }

        if let Some(skip) = inhibit_any_policy_skip(cert) {
            inhibit_any_policy = inhibit_any_policy.min(skip);
        }
    }

    // Wrap-up (RFC 5280 section 6.1.5).
    explicit_policy = explicit_policy.saturating_sub(1);
    if let Some(target) = path.last() {
        if policy_constraints(target).0 == Some(0) {
            explicit_policy = 0;
        }
    }

    if let Some(t) = tree.as_mut() {
        intersect_with_initial_policies(t, &params.initial_policies);
        if t.is_empty() {
            tree = None;
        }
    }

    if explicit_policy > 0 || tree.is_some() {
        Ok(())
    } else {
        Err("no valid policy satisfies the acceptable initial policies".to_string())
    }
}

fn add_level(tree: &mut PolicyTree, policies: &[String], any_allowed: bool) {
    let prev = tree.levels.last().cloned().unwrap_or_default();
    let mut next: Vec<Node> = vec![];

    for policy in policies.iter().filter(|p| *p != ANY_POLICY) {
        let matching: Vec<usize> = prev
            .iter()
            .enumerate()
            .filter(|(_, node)| node.expected_policy_set.contains(policy))
            .map(|(idx, _)| idx)
            .collect();

        if matching.is_empty() {
            for (idx, _) in prev
                .iter()
                .enumerate()
                .filter(|(_, node)| node.valid_policy == ANY_POLICY)
            {
                next.push(Node::child(policy, BTreeSet::from([policy.clone()]), idx));
            }
        } else {
            for idx in matching {
                next.push(Node::child(policy, BTreeSet::from([policy.clone()]), idx));
            }
        }
    }

    if any_allowed && policies.iter().any(|p| p == ANY_POLICY) {
        for (idx, node) in prev.iter().enumerate() {
            for expected in &node.expected_policy_set {
                let exists = next
                    .iter()
                    .any(|c| c.parent == Some(idx) && &c.valid_policy == expected);
                if !exists {
                    next.push(Node::child(expected, BTreeSet::from([expected.clone()]), idx));
                }
            }
        }
    }

    tree.levels.push(next);
}

fn apply_mappings(tree: &mut PolicyTree, mappings: &BTreeMap<String, BTreeSet<String>>, allowed: bool) {
    let depth = tree.depth();

    if !allowed {
        let keep = tree
            .levels
            .get(depth)
            .map(|level| {
                level
                    .iter()
                    .map(|node| !mappings.contains_key(&node.valid_policy))
                    .collect()
            })
            .unwrap_or_default();
        tree.retain_mask(depth, keep);
        tree.prune();
        return;
    }

    let Some(level) = tree.levels.get_mut(depth) else {
        return;
    };

    for (issuer_policy, subject_policies) in mappings {
        let mut found = false;
        for node in level.iter_mut().filter(|n| &n.valid_policy == issuer_policy) {
            node.expected_policy_set = subject_policies.clone();
            found = true;
        }

        if !found {
            let any_parent = level
                .iter()
                .find(|n| n.valid_policy == ANY_POLICY)
                .map(|n| n.parent);
            if let Some(parent) = any_parent {
                level.push(Node {
                    valid_policy: issuer_policy.clone(),
                    expected_policy_set: subject_policies.clone(),
                    parent,
                });
            }
        }
    }
}

fn intersect_with_initial_policies(tree: &mut PolicyTree, initial: &BTreeSet<String>) {
    if initial.is_empty() || initial.contains(ANY_POLICY) {
        return;
    }

    // Nodes whose parent has the valid policy anyPolicy.
    let mut node_set_policies = BTreeSet::new();
    for level in 1..tree.levels.len() {
        let (Some(parents), Some(nodes)) = (tree.levels.get(level - 1), tree.levels.get(level))
        else {
            break;
        };

        let keep: Vec<bool> = nodes
            .iter()
            .map(|n| {
                let in_node_set = n
                    .parent
                    .and_then(|p| parents.get(p))
                    .is_some_and(|parent| parent.valid_policy == ANY_POLICY);
                if in_node_set {
                    node_set_policies.insert(n.valid_policy.clone());
                }
                !in_node_set || n.valid_policy == ANY_POLICY || initial.contains(&n.valid_policy)
            })
            .collect();

        tree.retain_mask(level, keep);
    }

    // Replace an anyPolicy leaf with the unmatched initial policies.
    let depth = tree.depth();
    if let Some(level) = tree.levels.get_mut(depth) {
        if let Some(any_parent) = level
            .iter()
            .find(|n| n.valid_policy == ANY_POLICY)
            .map(|n| n.parent)
        {
            for policy in initial.iter().filter(|p| !node_set_policies.contains(*p)) {
                level.push(Node {
                    valid_policy: policy.clone(),
                    expected_policy_set: BTreeSet::from([policy.clone()]),
                    parent: any_parent,
                });
            }
            level.retain(|n| n.valid_policy != ANY_POLICY);
        }
    }

    tree.prune();
}

fn certificate_policies(cert: &PathCertificate) -> Result<Option<Vec<String>>, String> {
    for ext in cert.cert.extensions() {
        match ext.parsed_extension() {
            ParsedExtension::CertificatePolicies(policies) => {
                return Ok(Some(
                    policies
                        .iter()
                        .map(|p| p.policy_id.to_id_string())
                        .collect(),
                ));
            }
            ParsedExtension::ParseError { error } if ext.oid.to_id_string() == "2.5.29.32" => {
                return Err(format!("invalid certificate policies extension: {error:?}"));
            }
            _ => {}
        }
    }
    Ok(None)
}

fn policy_mappings(cert: &PathCertificate) -> Result<BTreeMap<String, BTreeSet<String>>, String> {
    let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for ext in cert.cert.extensions() {
        if let ParsedExtension::PolicyMappings(pm) = ext.parsed_extension() {
            for mapping in &pm.mappings {
                let issuer = mapping.issuer_domain_policy.to_id_string();
                let subject = mapping.subject_domain_policy.to_id_string();
                if issuer == ANY_POLICY || subject == ANY_POLICY {
                    return Err("policy mapping to or from anyPolicy".to_string());
                }
                map.entry(issuer).or_default().insert(subject);
            }
        }
    }

    Ok(map)
}

fn policy_constraints(cert: &PathCertificate) -> (Option<usize>, Option<usize>) {
    for ext in cert.cert.extensions() {
        if let ParsedExtension::PolicyConstraints(pc) = ext.parsed_extension() {
            return (
                pc.require_explicit_policy.map(|v| v as usize),
                pc.inhibit_policy_mapping.map(|v| v as usize),
            );
        }
    }
    (None, None)
}

fn inhibit_any_policy_skip(cert: &PathCertificate) -> Option<usize> {
    cert.cert.extensions().iter().find_map(|ext| match ext.parsed_extension() {
        ParsedExtension::InhibitAnyPolicy(iap) => Some(iap.skip_certs as usize),
        _ => None,
    })
}
