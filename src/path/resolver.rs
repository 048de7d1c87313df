use std::collections::BTreeMap;

use tracing::debug;

use super::descriptor::parse_text_path;
use super::descriptor::DescriptorPath;
use super::Path;
use super::PathDescriptor;
use super::PathElem;
use super::RequestOptions;
use crate::constants::DEFAULT_ORIGIN;
use crate::constants::META_ELEM;
use crate::ResolutionError;

/// Reduces a descriptor to a wire path plus its request options.
///
/// Every path whose first element is not `meta` is an OpenConfig path and
/// gets the `openconfig` origin unless the descriptor names one.
pub fn resolve_path(descriptor: &PathDescriptor) -> std::result::Result<(Path, RequestOptions), ResolutionError> {
    let raw = match &descriptor.path {
        DescriptorPath::Text(text) => parse_text_path(text)?,
        DescriptorPath::Elems(elems) => elems.clone(),
    };

    let mut elems = Vec::with_capacity(raw.len());
    for (index, e) in raw.iter().enumerate() {
        if e.name.is_empty() {
            return Err(ResolutionError::EmptyElement {
                index,
                path: render_partial(&raw),
            });
        }
        let mut keys = BTreeMap::new();
        for (k, v) in &e.keys {
            if k.is_empty() {
                return Err(ResolutionError::EmptyKeyName { elem: e.name.clone() });
            }
            if keys.insert(k.clone(), v.clone()).is_some() {
                return Err(ResolutionError::DuplicateKey {
                    elem: e.name.clone(),
                    key: k.clone(),
                });
            }
        }
        elems.push(PathElem {
            name: e.name.clone(),
            keys,
        });
    }

    let origin = match &descriptor.origin {
        Some(origin) => origin.clone(),
        None if elems.first().map(|e| e.name.as_str()) == Some(META_ELEM) => String::new(),
        None => DEFAULT_ORIGIN.to_string(),
    };

    let mut path = Path::new(elems).with_origin(origin);
    if let Some(target) = &descriptor.target {
        path = path.with_target(target.clone());
    }
    debug!(%path, origin = path.origin(), "resolved path descriptor");

    Ok((path, descriptor.options.clone()))
}

fn render_partial(elems: &[super::DescriptorElem]) -> String {
    let names: Vec<&str> = elems.iter().map(|e| e.name.as_str()).collect();
    format!("/{}", names.join("/"))
}
