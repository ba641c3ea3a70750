use crate::crypto::digest;
use serde::{Deserialize, Serialize};

/// What to do with the unpaired last id of an odd-length layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddLeafPolicy {
    /// Leave it out of the next layer. Blocks built by earlier releases use this.
    #[default]
    Drop,
    /// Pair it with itself, as Bitcoin-style trees do.
    Duplicate,
}

/// Folds ordered transaction ids into one root by hashing the concatenation of
/// adjacent pairs, layer by layer. No ids gives `""`; one id gives that id.
pub fn merkle_root<S: AsRef<str>>(ids: &[S], policy: OddLeafPolicy) -> String {
    let mut layer: Vec<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();

    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .filter_map(|pair| match pair {
                [left, right] => Some(digest(format!("{}{}", left, right))),
                [last] => match policy {
                    OddLeafPolicy::Drop => None,
                    OddLeafPolicy::Duplicate => Some(digest(format!("{}{}", last, last))),
                },
                _ => None,
            })
            .collect();
    }

    layer.pop().unwrap_or_default()
}
