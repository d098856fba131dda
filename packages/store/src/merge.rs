//! Recursive merge of a map into the tree.

use std::collections::BTreeMap;
use std::rc::Rc;

use statetree_core::path::is_resource_key;
use statetree_core::Path;

use crate::error::{Error, Result};
use crate::field::Field;
use crate::proxy::{Proxy, Read, View};
use crate::store::Shared;

pub(crate) fn merge(shared: &Rc<Shared>, field: Field) -> Result<()> {
    let entries = field.into_entries().map_err(|_| Error::InvalidMerge)?;
    for (key, field) in &entries {
        Path::root().child(key)?;
        for nested in field.keys() {
            Path::root().child(nested)?;
        }
    }

    let root = shared.proxy_for(shared.root(), &View::Store);
    merge_into(&root, entries)
}

fn merge_into(target: &Proxy, entries: BTreeMap<String, Field>) -> Result<()> {
    for (key, field) in entries {
        if !field.is_map() || is_resource_key(&key) {
            target.define(&key, field)?;
            continue;
        }

        match target.get(&key) {
            Ok(Read::Node(child)) if !child.is_frozen() && matches!(child.is_list(), Ok(false)) => {
                match field.into_entries() {
                    Ok(nested) => merge_into(&child, nested)?,
                    Err(field) => target.define(&key, field)?,
                }
            }
            _ => target.define(&key, field)?,
        }
    }
    Ok(())
}
