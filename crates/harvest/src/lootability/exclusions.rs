use std::collections::HashSet;
use std::sync::RwLock;

use tracing::debug;

use crate::catalog::{FormId, LocationId};
use crate::sync::{read_or_recover, write_or_recover};

/// User-maintained exclusions. Unlike the registries in `StateStore` these are never cleared
/// by a reset; the host owns their lifetime.
#[derive(Debug, Default)]
pub struct UserExclusions {
    forms: RwLock<HashSet<FormId>>,
    locations: RwLock<HashSet<LocationId>>,
}

impl UserExclusions {
    pub fn exclude_form(&self, form: FormId) -> bool {
        let added = write_or_recover(&self.forms, "excluded_forms").insert(form);
        if added {
            debug!(form = %form, "form_excluded");
        }
        added
    }

    pub fn include_form(&self, form: FormId) -> bool {
        write_or_recover(&self.forms, "excluded_forms").remove(&form)
    }

    pub fn is_form_excluded(&self, form: FormId) -> bool {
        read_or_recover(&self.forms, "excluded_forms").contains(&form)
    }

    pub fn exclude_location(&self, location: LocationId) -> bool {
        let added = write_or_recover(&self.locations, "excluded_locations").insert(location);
        if added {
            debug!(location = location.0, "location_excluded");
        }
        added
    }

    pub fn include_location(&self, location: LocationId) -> bool {
        write_or_recover(&self.locations, "excluded_locations").remove(&location)
    }

    pub fn is_location_excluded(&self, location: LocationId) -> bool {
        read_or_recover(&self.locations, "excluded_locations").contains(&location)
    }
}
