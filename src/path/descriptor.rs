use std::collections::BTreeMap;

use crate::proto::gnmi::SubscriptionMode;
use crate::ResolutionError;

/// Request options carried by a descriptor, applied when the path is
/// subscribed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Overrides the configured per-path subscription mode
    pub subscription_mode: Option<SubscriptionMode>,
    /// Serve ONCE subscriptions with a single Get of config data
    pub use_get_for_config: bool,
    /// Outgoing gRPC metadata attached to the RPC
    pub metadata: BTreeMap<String, String>,
}

/// One element of a builder-form descriptor. Keys keep insertion order so
/// duplicates can be reported at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorElem {
    pub name: String,
    pub keys: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DescriptorPath {
    Text(String),
    Elems(Vec<DescriptorElem>),
}

/// Structured description of a telemetry path before it is reduced to a
/// wire path. Nothing is validated until [`crate::resolve_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDescriptor {
    pub(crate) path: DescriptorPath,
    pub(crate) origin: Option<String>,
    pub(crate) target: Option<String>,
    pub(crate) options: RequestOptions,
}

impl PathDescriptor {
    /// The root of the data tree; extend it with [`Self::elem`] / [`Self::keyed`].
    pub fn root() -> Self {
        Self {
            path: DescriptorPath::Elems(Vec::new()),
            origin: None,
            target: None,
            options: RequestOptions::default(),
        }
    }

    /// Textual form, e.g. `/interfaces/interface[name=eth0]/state/oper-status`.
    pub fn parse(text: impl Into<String>) -> Self {
        Self {
            path: DescriptorPath::Text(text.into()),
            ..Self::root()
        }
    }

    pub fn elem(
        self,
        name: impl Into<String>,
    ) -> Self {
        self.keyed(name, std::iter::empty::<(String, String)>())
    }

    pub fn keyed<I, K, V>(
        mut self,
        name: impl Into<String>,
        keys: I,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let elem = DescriptorElem {
            name: name.into(),
            keys: keys.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        };
        match &mut self.path {
            DescriptorPath::Elems(elems) => elems.push(elem),
            DescriptorPath::Text(text) => {
                // Appending to a textual descriptor keeps it textual.
                text.push('/');
                text.push_str(&elem.name);
                for (k, v) in &elem.keys {
                    text.push_str(&format!("[{k}={}]", escape_key_value(v)));
                }
            }
        }
        self
    }

    pub fn with_origin(
        mut self,
        origin: impl Into<String>,
    ) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_target(
        mut self,
        target: impl Into<String>,
    ) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_subscription_mode(
        mut self,
        mode: SubscriptionMode,
    ) -> Self {
        self.options.subscription_mode = Some(mode);
        self
    }

    pub fn use_get_for_config(
        mut self,
        enabled: bool,
    ) -> Self {
        self.options.use_get_for_config = enabled;
        self
    }

    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.options.metadata.insert(key.into(), value.into());
        self
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }
}

fn escape_key_value(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for c in v.chars() {
        if c == ']' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Splits `/a/b[k=v]/c` into elements. Backslash escapes the next character.
pub(crate) fn parse_text_path(text: &str) -> std::result::Result<Vec<DescriptorElem>, ResolutionError> {
    let Some(body) = text.strip_prefix('/') else {
        return Err(ResolutionError::NotAbsolute(text.to_string()));
    };
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let mut elems = Vec::new();
    let mut name = String::new();
    let mut keys: Vec<(String, String)> = Vec::new();
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    name.push(escaped);
                }
            }
            '/' => {
                elems.push(DescriptorElem {
                    name: std::mem::take(&mut name),
                    keys: std::mem::take(&mut keys),
                });
            }
            '[' => {
                let mut key = String::new();
                let mut value = String::new();
                let mut seen_eq = false;
                let mut closed = false;
                while let Some(k) = chars.next() {
                    match k {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                if seen_eq {
                                    value.push(escaped)
                                } else {
                                    key.push(escaped)
                                }
                            }
                        }
                        ']' => {
                            closed = true;
                            break;
                        }
                        '=' if !seen_eq => seen_eq = true,
                        other => {
                            if seen_eq {
                                value.push(other)
                            } else {
                                key.push(other)
                            }
                        }
                    }
                }
                if !closed {
                    return Err(ResolutionError::UnbalancedBrackets(text.to_string()));
                }
                if !seen_eq {
                    return Err(ResolutionError::MalformedKey {
                        elem: name.clone(),
                        selector: key,
                    });
                }
                keys.push((key, value));
            }
            ']' => return Err(ResolutionError::UnbalancedBrackets(text.to_string())),
            other => {
                if !keys.is_empty() {
                    return Err(ResolutionError::MalformedKey {
                        elem: name.clone(),
                        selector: other.to_string(),
                    });
                }
                name.push(other);
            }
        }
    }
    elems.push(DescriptorElem { name, keys });
    Ok(elems)
}
