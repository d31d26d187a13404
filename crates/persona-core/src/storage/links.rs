//! Persona ↔ Profile links
//!
//! `attach_profile` is the only operation that writes
//! `ProfileRecord::linked_persona`. Both sides of the link are written in
//! one redb write transaction: either the persona's `linked_profiles` entry
//! and the profile's back-reference both land, or neither does.

use crate::error::{PersonaError, PersonaResult};
use crate::identifier::{PersonaIdentifier, ProfileIdentifier};
use crate::types::{LinkedProfileDetails, PersonaRecord, ProfileRecord};

use super::personas::PERSONAS_TABLE;
use super::profiles::PROFILES_TABLE;
use super::{encode_record, read_record, Storage};

impl Storage {
    /// Link `profile_id` to `persona_id`.
    ///
    /// Within one transaction:
    /// 1. Load the persona, failing with `PersonaNotFound` if it is absent.
    /// 2. Merge `details` into `persona.linked_profiles[profile_id]`.
    /// 3. If the profile record exists, point its `linked_persona` at the
    ///    persona. A profile moving away from another persona is removed
    ///    from that persona's `linked_profiles`.
    pub fn attach_profile(
        &self,
        profile_id: &ProfileIdentifier,
        persona_id: &PersonaIdentifier,
        details: &LinkedProfileDetails,
    ) -> PersonaResult<()> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        {
            let mut personas = write_txn.open_table(PERSONAS_TABLE)?;
            let mut profiles = write_txn.open_table(PROFILES_TABLE)?;

            let persona_key = persona_id.to_text();
            let profile_key = profile_id.to_text();

            // Dropping the transaction without commit aborts it
            let mut persona: PersonaRecord = read_record(&personas, &persona_key)?
                .ok_or_else(|| PersonaError::PersonaNotFound(persona_key.clone()))?;

            persona
                .linked_profiles
                .entry(profile_id.clone())
                .and_modify(|existing| existing.merge(details))
                .or_insert_with(|| details.clone());
            persona.touch();

            let profile: Option<ProfileRecord> = read_record(&profiles, &profile_key)?;
            if let Some(mut profile) = profile {
                if let Some(previous) = profile.linked_persona.as_ref().filter(|p| *p != persona_id) {
                    let previous_key = previous.to_text();
                    let previous_persona: Option<PersonaRecord> =
                        read_record(&personas, &previous_key)?;
                    if let Some(mut previous_persona) = previous_persona {
                        previous_persona.linked_profiles.remove(profile_id);
                        previous_persona.touch();
                        let serialized = encode_record(&previous_persona)?;
                        personas.insert(previous_key.as_str(), serialized.as_slice())?;
                        tracing::debug!(
                            profile = %profile_key,
                            from = %previous_key,
                            "Moved profile away from previous persona"
                        );
                    }
                }

                profile.linked_persona = Some(persona_id.clone());
                profile.touch();
                let serialized = encode_record(&profile)?;
                profiles.insert(profile_key.as_str(), serialized.as_slice())?;
            }

            let serialized = encode_record(&persona)?;
            personas.insert(persona_key.as_str(), serialized.as_slice())?;
        }
        write_txn.commit()?;

        tracing::debug!(
            profile = %profile_id,
            persona = %persona_id,
            state = %details.connection_confirm_state,
            "Attached profile to persona"
        );
        Ok(())
    }
}
