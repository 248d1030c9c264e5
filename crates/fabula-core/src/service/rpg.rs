//! RPG systems, skills and classes.
//!
//! Built-in systems live in the reserved [`TenantId::BUILTIN`] slot. Every
//! tenant can read them and attach its own skills, classes and items to
//! them, but only the system slot may change them.

use std::collections::HashSet;

use fabula_types::{
    AuditAction, CharacterSkill, ClassSkill, ClassSkillId, EntityKind, RpgClass, RpgClassId,
    RpgSystem, RpgSystemId, Skill, SkillCategory, SkillId, SkillType, TenantId,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{Deps, bounded, json_object, optional, require_tenant, required};
use crate::cascade;
use crate::clock;
use crate::error::CoreError;
use crate::store::{Filter, Isolation, Table, Tx};
use crate::tenant::TenantContext;

/// Rank cap given to skills created without one.
pub const DEFAULT_MAX_RANK: u32 = 10;
/// Tier given to classes created without one.
pub const DEFAULT_TIER: u8 = 1;
/// Highest class tier.
pub const MAX_TIER: u8 = 3;

const BUILTIN: TenantContext = TenantContext::new(TenantId::BUILTIN);

/// Load a system visible to the transaction's tenant: its own or a
/// built-in one.
pub(crate) async fn find_system(tx: &mut Tx, id: RpgSystemId) -> Result<RpgSystem, CoreError> {
    if let Some(system) = tx.find::<RpgSystem>(id).await? {
        return Ok(system);
    }
    tx.find_in(Table::RpgSystems, TenantId::BUILTIN, id.into_inner())
        .await?
        .ok_or_else(|| CoreError::not_found("rpg system", id))
}

/// Load a system the tenant may modify.
async fn owned_system(tx: &mut Tx, id: RpgSystemId) -> Result<RpgSystem, CoreError> {
    let system = find_system(tx, id).await?;
    if system.is_builtin {
        return Err(CoreError::Forbidden(format!(
            "built-in rpg system {id} cannot be modified"
        )));
    }
    Ok(system)
}

fn optional_object(field: &'static str, value: Option<Value>) -> Result<Option<Value>, CoreError> {
    if let Some(value) = &value {
        json_object(field, value)?;
    }
    Ok(value)
}

fn object_or_empty(field: &'static str, value: Option<Value>) -> Result<Value, CoreError> {
    Ok(optional_object(field, value)?.unwrap_or_else(|| Value::Object(serde_json::Map::new())))
}

fn array_or_empty(field: &'static str, value: Option<Value>) -> Result<Value, CoreError> {
    match value {
        None => Ok(Value::Array(Vec::new())),
        Some(value) if value.is_array() => Ok(value),
        Some(_) => Err(CoreError::validation(
            field,
            format!("{field} must be a JSON array"),
        )),
    }
}

fn max_rank(value: u32) -> Result<u32, CoreError> {
    if value == 0 {
        Err(CoreError::validation("max_rank", "max_rank must be at least 1"))
    } else {
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// Input of [`RpgSystemService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewRpgSystem {
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Schema of the base stats payload. May list the recognised keys
    /// under `attributes`.
    pub base_stats_schema: Value,
    /// Schema of derived stats.
    #[serde(default)]
    pub derived_stats_schema: Option<Value>,
    /// Schema of progression data.
    #[serde(default)]
    pub progression_schema: Option<Value>,
}

/// Edits accepted by [`RpgSystemService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RpgSystemChanges {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// Replacement base stats schema.
    pub base_stats_schema: Option<Value>,
    /// Replacement derived stats schema.
    pub derived_stats_schema: Option<Value>,
    /// Replacement progression schema.
    pub progression_schema: Option<Value>,
}

fn build_system(input: NewRpgSystem, tenant: Option<TenantId>) -> Result<RpgSystem, CoreError> {
    let name = required("name", &input.name)?;
    json_object("base_stats_schema", &input.base_stats_schema)?;
    let now = clock::now();
    Ok(RpgSystem {
        id: RpgSystemId::new(),
        tenant_id: tenant,
        name,
        description: optional(input.description),
        base_stats_schema: input.base_stats_schema,
        derived_stats_schema: optional_object("derived_stats_schema", input.derived_stats_schema)?,
        progression_schema: optional_object("progression_schema", input.progression_schema)?,
        is_builtin: tenant.is_none(),
        created_at: now,
        updated_at: now,
    })
}

/// RPG system use cases.
#[derive(Debug, Clone)]
pub struct RpgSystemService {
    deps: Deps,
}

impl RpgSystemService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Create a tenant-owned system.
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: NewRpgSystem,
    ) -> Result<RpgSystem, CoreError> {
        let system = build_system(input, Some(ctx.tenant_id))?;
        let mut tx = self.deps.open(ctx).await?;
        require_tenant(&mut tx).await?;
        tx.insert(&system).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::RpgSystem, system.id)
            .await;
        self.deps.side.ingest(ctx, "rpg_system", system.id).await;
        Ok(system)
    }

    /// Register a built-in system visible to every tenant.
    pub async fn install_builtin(&self, input: NewRpgSystem) -> Result<RpgSystem, CoreError> {
        let system = build_system(input, None)?;
        let mut tx = self.deps.open(&BUILTIN).await?;
        tx.insert(&system).await?;
        tx.commit().await?;
        info!(rpg_system_id = %system.id, name = %system.name, "Built-in rpg system installed");
        Ok(system)
    }

    /// Load a system owned by the tenant or built in.
    pub async fn get(&self, ctx: &TenantContext, id: RpgSystemId) -> Result<RpgSystem, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        find_system(&mut tx, id).await
    }

    /// Built-in systems followed by the tenant's own.
    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<RpgSystem>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut systems: Vec<RpgSystem> = tx
            .list_in(Table::RpgSystems, TenantId::BUILTIN, Filter::all())
            .await?;
        systems.extend(tx.list::<RpgSystem>(Filter::all()).await?);
        Ok(systems)
    }

    /// Update a tenant-owned system.
    ///
    /// # Errors
    ///
    /// `Forbidden` for built-in systems.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: RpgSystemId,
        changes: RpgSystemChanges,
    ) -> Result<RpgSystem, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut system = owned_system(&mut tx, id).await?;
        if let Some(name) = changes.name {
            system.name = required("name", &name)?;
        }
        if let Some(description) = changes.description {
            system.description = optional(Some(description));
        }
        if let Some(schema) = changes.base_stats_schema {
            json_object("base_stats_schema", &schema)?;
            system.base_stats_schema = schema;
        }
        if let Some(schema) = changes.derived_stats_schema {
            system.derived_stats_schema = optional_object("derived_stats_schema", Some(schema))?;
        }
        if let Some(schema) = changes.progression_schema {
            system.progression_schema = optional_object("progression_schema", Some(schema))?;
        }
        system.updated_at = clock::now();
        tx.update(&system).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::RpgSystem, id)
            .await;
        self.deps.side.ingest(ctx, "rpg_system", id).await;
        Ok(system)
    }

    /// Delete a tenant-owned system with its skills, classes, slots and
    /// items. Worlds using it are detached.
    ///
    /// # Errors
    ///
    /// `Forbidden` for built-in systems.
    pub async fn delete(&self, ctx: &TenantContext, id: RpgSystemId) -> Result<(), CoreError> {
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        owned_system(&mut tx, id).await?;
        cascade::system_contents(&mut tx, id.into_inner()).await?;
        tx.delete::<RpgSystem>(id).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, EntityKind::RpgSystem, id)
            .await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

/// Input of [`SkillService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewSkill {
    /// Defining system.
    pub rpg_system_id: RpgSystemId,
    /// Display name.
    pub name: String,
    /// Skill category.
    pub category: SkillCategory,
    /// Activation model.
    #[serde(rename = "type")]
    pub skill_type: SkillType,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Prerequisites, an empty array when absent.
    #[serde(default)]
    pub prerequisites: Option<Value>,
    /// Rank cap, 10 when absent.
    #[serde(default)]
    pub max_rank: Option<u32>,
    /// Schema of the skill's effects.
    #[serde(default)]
    pub effects_schema: Option<Value>,
}

/// Edits accepted by [`SkillService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SkillChanges {
    /// New name.
    pub name: Option<String>,
    /// New category.
    pub category: Option<SkillCategory>,
    /// New activation model.
    #[serde(rename = "type")]
    pub skill_type: Option<SkillType>,
    /// New description.
    pub description: Option<String>,
    /// Replacement prerequisites.
    pub prerequisites: Option<Value>,
    /// New rank cap.
    pub max_rank: Option<u32>,
    /// Replacement effects schema.
    pub effects_schema: Option<Value>,
}

/// Skill use cases.
#[derive(Debug, Clone)]
pub struct SkillService {
    deps: Deps,
}

impl SkillService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Define a skill in a system.
    pub async fn create(&self, ctx: &TenantContext, input: NewSkill) -> Result<Skill, CoreError> {
        let name = required("name", &input.name)?;
        let max_rank = max_rank(input.max_rank.unwrap_or(DEFAULT_MAX_RANK))?;
        let prerequisites = array_or_empty("prerequisites", input.prerequisites)?;
        let effects_schema = optional_object("effects_schema", input.effects_schema)?;

        let mut tx = self.deps.open(ctx).await?;
        require_tenant(&mut tx).await?;
        find_system(&mut tx, input.rpg_system_id).await?;

        let now = clock::now();
        let skill = Skill {
            id: SkillId::new(),
            tenant_id: ctx.tenant_id,
            rpg_system_id: input.rpg_system_id,
            name,
            category: input.category,
            skill_type: input.skill_type,
            description: optional(input.description),
            prerequisites,
            max_rank,
            effects_schema,
            created_at: now,
            updated_at: now,
        };
        tx.insert(&skill).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::RpgSkill, skill.id)
            .await;
        self.deps.side.ingest(ctx, "rpg_skill", skill.id).await;
        Ok(skill)
    }

    /// Load a skill.
    pub async fn get(&self, ctx: &TenantContext, id: SkillId) -> Result<Skill, CoreError> {
        self.deps.open(ctx).await?.fetch(id).await
    }

    /// Skills the tenant defined in `system`.
    pub async fn list_by_system(
        &self,
        ctx: &TenantContext,
        system: RpgSystemId,
    ) -> Result<Vec<Skill>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        find_system(&mut tx, system).await?;
        tx.list(Filter::scope(system.into_inner())).await
    }

    /// Update a skill.
    ///
    /// # Errors
    ///
    /// `Validation` on `max_rank` when a character already holds a higher
    /// rank than the new cap.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: SkillId,
        changes: SkillChanges,
    ) -> Result<Skill, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let mut skill: Skill = tx.fetch(id).await?;
        if let Some(name) = changes.name {
            skill.name = required("name", &name)?;
        }
        if let Some(category) = changes.category {
            skill.category = category;
        }
        if let Some(skill_type) = changes.skill_type {
            skill.skill_type = skill_type;
        }
        if let Some(description) = changes.description {
            skill.description = optional(Some(description));
        }
        if let Some(prerequisites) = changes.prerequisites {
            skill.prerequisites = array_or_empty("prerequisites", Some(prerequisites))?;
        }
        if let Some(schema) = changes.effects_schema {
            skill.effects_schema = optional_object("effects_schema", Some(schema))?;
        }
        if let Some(cap) = changes.max_rank {
            let cap = max_rank(cap)?;
            let learned: Vec<CharacterSkill> =
                tx.list(Filter::referencing(id.into_inner())).await?;
            if learned.iter().any(|s| s.rank > cap) {
                return Err(CoreError::validation(
                    "max_rank",
                    "a character already holds a higher rank",
                ));
            }
            skill.max_rank = cap;
        }
        skill.updated_at = clock::now();
        tx.update(&skill).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::RpgSkill, id)
            .await;
        self.deps.side.ingest(ctx, "rpg_skill", id).await;
        Ok(skill)
    }

    /// Delete a skill, its class links and every character's progress.
    pub async fn delete(&self, ctx: &TenantContext, id: SkillId) -> Result<(), CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        let skill: Skill = tx.fetch(id).await?;
        cascade::skill(&mut tx, &skill).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, EntityKind::RpgSkill, id)
            .await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

/// Input of [`RpgClassService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewRpgClass {
    /// Defining system.
    pub rpg_system_id: RpgSystemId,
    /// Display name.
    pub name: String,
    /// Tier, 1 when absent.
    #[serde(default)]
    pub tier: Option<u8>,
    /// Class this one evolves from.
    #[serde(default)]
    pub parent_class_id: Option<RpgClassId>,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Entry requirements object.
    #[serde(default)]
    pub requirements: Option<Value>,
    /// Stat bonuses object.
    #[serde(default)]
    pub stat_bonuses: Option<Value>,
}

/// Edits accepted by [`RpgClassService::update`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RpgClassChanges {
    /// New name.
    pub name: Option<String>,
    /// New tier.
    pub tier: Option<u8>,
    /// New parent class.
    pub parent_class_id: Option<RpgClassId>,
    /// New description.
    pub description: Option<String>,
    /// Replacement requirements.
    pub requirements: Option<Value>,
    /// Replacement stat bonuses.
    pub stat_bonuses: Option<Value>,
}

async fn parent_class(
    tx: &mut Tx,
    parent: RpgClassId,
    system: RpgSystemId,
) -> Result<RpgClass, CoreError> {
    let parent: RpgClass = tx.fetch(parent).await?;
    if parent.rpg_system_id == system {
        Ok(parent)
    } else {
        Err(CoreError::validation(
            "parent_class_id",
            "parent class must belong to the same rpg system",
        ))
    }
}

/// Reject a parent that is `class` itself or evolves from it.
async fn ensure_not_descendant(
    tx: &mut Tx,
    class: RpgClassId,
    parent: RpgClassId,
) -> Result<(), CoreError> {
    let mut seen = HashSet::new();
    let mut cursor = Some(parent);
    while let Some(current) = cursor {
        if current == class {
            return Err(CoreError::validation(
                "parent_class_id",
                "a class cannot evolve from itself or its descendants",
            ));
        }
        if !seen.insert(current) {
            break;
        }
        cursor = tx
            .find::<RpgClass>(current)
            .await?
            .and_then(|c| c.parent_class_id);
    }
    Ok(())
}

/// RPG class use cases.
#[derive(Debug, Clone)]
pub struct RpgClassService {
    deps: Deps,
}

impl RpgClassService {
    /// Create the service.
    pub const fn new(deps: Deps) -> Self {
        Self { deps }
    }

    /// Define a class in a system.
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: NewRpgClass,
    ) -> Result<RpgClass, CoreError> {
        let name = required("name", &input.name)?;
        let tier = bounded("tier", input.tier.unwrap_or(DEFAULT_TIER), 1, MAX_TIER)?;
        let requirements = object_or_empty("requirements", input.requirements)?;
        let stat_bonuses = object_or_empty("stat_bonuses", input.stat_bonuses)?;

        let mut tx = self.deps.open(ctx).await?;
        require_tenant(&mut tx).await?;
        find_system(&mut tx, input.rpg_system_id).await?;
        if let Some(parent) = input.parent_class_id {
            parent_class(&mut tx, parent, input.rpg_system_id).await?;
        }

        let now = clock::now();
        let class = RpgClass {
            id: RpgClassId::new(),
            tenant_id: ctx.tenant_id,
            rpg_system_id: input.rpg_system_id,
            parent_class_id: input.parent_class_id,
            name,
            tier,
            description: optional(input.description),
            requirements,
            stat_bonuses,
            created_at: now,
            updated_at: now,
        };
        tx.insert(&class).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Create, EntityKind::RpgClass, class.id)
            .await;
        self.deps.side.ingest(ctx, "rpg_class", class.id).await;
        Ok(class)
    }

    /// Load a class.
    pub async fn get(&self, ctx: &TenantContext, id: RpgClassId) -> Result<RpgClass, CoreError> {
        self.deps.open(ctx).await?.fetch(id).await
    }

    /// Classes the tenant defined in `system`, by tier.
    pub async fn list_by_system(
        &self,
        ctx: &TenantContext,
        system: RpgSystemId,
    ) -> Result<Vec<RpgClass>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        find_system(&mut tx, system).await?;
        tx.list(Filter::scope(system.into_inner())).await
    }

    /// Update a class. A new parent must not create an evolution cycle.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: RpgClassId,
        changes: RpgClassChanges,
    ) -> Result<RpgClass, CoreError> {
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        let mut class: RpgClass = tx.fetch(id).await?;
        if let Some(name) = changes.name {
            class.name = required("name", &name)?;
        }
        if let Some(tier) = changes.tier {
            class.tier = bounded("tier", tier, 1, MAX_TIER)?;
        }
        if let Some(parent) = changes.parent_class_id {
            parent_class(&mut tx, parent, class.rpg_system_id).await?;
            ensure_not_descendant(&mut tx, id, parent).await?;
            class.parent_class_id = Some(parent);
        }
        if let Some(description) = changes.description {
            class.description = optional(Some(description));
        }
        if let Some(requirements) = changes.requirements {
            class.requirements = object_or_empty("requirements", Some(requirements))?;
        }
        if let Some(bonuses) = changes.stat_bonuses {
            class.stat_bonuses = object_or_empty("stat_bonuses", Some(bonuses))?;
        }
        class.updated_at = clock::now();
        tx.update(&class).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::RpgClass, id)
            .await;
        self.deps.side.ingest(ctx, "rpg_class", id).await;
        Ok(class)
    }

    /// Delete a class. Child classes become roots; characters lose it.
    pub async fn delete(&self, ctx: &TenantContext, id: RpgClassId) -> Result<(), CoreError> {
        let mut tx = self.deps.begin(ctx, Isolation::Serializable).await?;
        let class: RpgClass = tx.fetch(id).await?;
        cascade::class(&mut tx, &class).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Delete, EntityKind::RpgClass, id)
            .await;
        Ok(())
    }

    /// Grant `skill` to the class from `unlock_level` on.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when the class already grants the skill.
    pub async fn add_skill(
        &self,
        ctx: &TenantContext,
        class: RpgClassId,
        skill: SkillId,
        unlock_level: u32,
    ) -> Result<ClassSkill, CoreError> {
        if unlock_level == 0 {
            return Err(CoreError::validation(
                "unlock_level",
                "unlock_level must be at least 1",
            ));
        }
        let mut tx = self.deps.open(ctx).await?;
        let class_row: RpgClass = tx.fetch(class).await?;
        let skill_row: Skill = tx.fetch(skill).await?;
        if skill_row.rpg_system_id != class_row.rpg_system_id {
            return Err(CoreError::validation(
                "skill_id",
                "skill must belong to the class's rpg system",
            ));
        }
        let granted: Vec<ClassSkill> = tx.list(Filter::scope(class.into_inner())).await?;
        if granted.iter().any(|g| g.skill_id == skill) {
            return Err(CoreError::already_exists("class skill", "skill_id", skill));
        }

        let now = clock::now();
        let link = ClassSkill {
            id: ClassSkillId::new(),
            tenant_id: ctx.tenant_id,
            class_id: class,
            skill_id: skill,
            unlock_level,
            created_at: now,
            updated_at: now,
        };
        tx.insert(&link).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::RpgClass, class)
            .await;
        Ok(link)
    }

    /// Skills the class grants, by unlock level.
    pub async fn list_skills(
        &self,
        ctx: &TenantContext,
        class: RpgClassId,
    ) -> Result<Vec<ClassSkill>, CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<RpgClass>(class).await?;
        tx.list(Filter::scope(class.into_inner())).await
    }

    /// Stop granting `skill`.
    pub async fn remove_skill(
        &self,
        ctx: &TenantContext,
        class: RpgClassId,
        skill: SkillId,
    ) -> Result<(), CoreError> {
        let mut tx = self.deps.open(ctx).await?;
        tx.fetch::<RpgClass>(class).await?;
        let granted: Vec<ClassSkill> = tx.list(Filter::scope(class.into_inner())).await?;
        let link = granted
            .into_iter()
            .find(|g| g.skill_id == skill)
            .ok_or_else(|| CoreError::not_found("class skill", skill))?;
        tx.delete::<ClassSkill>(link.id).await?;
        tx.commit().await?;

        self.deps
            .side
            .audit(ctx, AuditAction::Update, EntityKind::RpgClass, class)
            .await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::service::tenant::{NewTenant, TenantService};
    use crate::side_channel::SideChannels;
    use crate::store::MemoryStore;

    async fn setup() -> (Deps, TenantContext) {
        let deps = Deps::new(Arc::new(MemoryStore::new()), Arc::new(SideChannels::noop()));
        let tenant = TenantService::new(deps.clone())
            .create(NewTenant { name: "Acme".into() })
            .await
            .unwrap();
        (deps, TenantContext::new(tenant.id))
    }

    fn system(name: &str) -> NewRpgSystem {
        NewRpgSystem {
            name: name.into(),
            description: None,
            base_stats_schema: json!({ "attributes": ["hp", "mp"] }),
            derived_stats_schema: None,
            progression_schema: None,
        }
    }

    fn class(system: RpgSystemId, name: &str, parent: Option<RpgClassId>) -> NewRpgClass {
        NewRpgClass {
            rpg_system_id: system,
            name: name.into(),
            tier: None,
            parent_class_id: parent,
            description: None,
            requirements: None,
            stat_bonuses: None,
        }
    }

    #[tokio::test]
    async fn builtin_systems_are_visible_but_read_only() {
        let (deps, ctx) = setup().await;
        let systems = RpgSystemService::new(deps);
        let d20 = systems.install_builtin(system("d20")).await.unwrap();
        systems.create(&ctx, system("Homebrew")).await.unwrap();

        let listed = systems.list(&ctx).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.first().unwrap().is_builtin);

        let err = systems
            .update(&ctx, d20.id, RpgSystemChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
        let err = systems.delete(&ctx, d20.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn schema_must_be_an_object() {
        let (deps, ctx) = setup().await;
        let mut input = system("Broken");
        input.base_stats_schema = json!(["hp"]);
        let err = RpgSystemService::new(deps)
            .create(&ctx, input)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "base_stats_schema", .. }));
    }

    #[tokio::test]
    async fn class_tier_and_evolution_rules() {
        let (deps, ctx) = setup().await;
        let sys = RpgSystemService::new(deps.clone())
            .create(&ctx, system("Homebrew"))
            .await
            .unwrap();
        let classes = RpgClassService::new(deps);

        let mut too_high = class(sys.id, "Archmage", None);
        too_high.tier = Some(4);
        let err = classes.create(&ctx, too_high).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "tier", .. }));

        let mage = classes.create(&ctx, class(sys.id, "Mage", None)).await.unwrap();
        assert_eq!(mage.tier, DEFAULT_TIER);
        let wizard = classes
            .create(&ctx, class(sys.id, "Wizard", Some(mage.id)))
            .await
            .unwrap();

        let err = classes
            .update(
                &ctx,
                mage.id,
                RpgClassChanges {
                    parent_class_id: Some(wizard.id),
                    ..RpgClassChanges::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "parent_class_id", .. }));
    }

    #[tokio::test]
    async fn class_skills_unlock_from_level_one() {
        let (deps, ctx) = setup().await;
        let sys = RpgSystemService::new(deps.clone())
            .create(&ctx, system("Homebrew"))
            .await
            .unwrap();
        let skill = SkillService::new(deps.clone())
            .create(
                &ctx,
                NewSkill {
                    rpg_system_id: sys.id,
                    name: "Fireball".into(),
                    category: SkillCategory::Magic,
                    skill_type: SkillType::Spell,
                    description: None,
                    prerequisites: None,
                    max_rank: None,
                    effects_schema: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(skill.max_rank, DEFAULT_MAX_RANK);

        let classes = RpgClassService::new(deps);
        let mage = classes.create(&ctx, class(sys.id, "Mage", None)).await.unwrap();
        let err = classes.add_skill(&ctx, mage.id, skill.id, 0).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "unlock_level", .. }));

        classes.add_skill(&ctx, mage.id, skill.id, 3).await.unwrap();
        let err = classes.add_skill(&ctx, mage.id, skill.id, 5).await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists { .. }));

        classes.remove_skill(&ctx, mage.id, skill.id).await.unwrap();
        assert!(classes.list_skills(&ctx, mage.id).await.unwrap().is_empty());
    }
}
