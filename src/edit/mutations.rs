//! Concrete structural mutations
//!
//! Constructors validate user input against the current document and reject
//! bad edits before anything reaches the engine. `apply`/`revert` then
//! assume a well-formed mutation; a failure there is an integrity violation.

use crate::core::{
    DocEntity, Entity, EntityId, EntityRef, House, HouseType, MapCell, ScriptAction,
    TaskForceEntry, WaypointId,
};
use crate::document::MapDocument;
use crate::edit::integrity::{self, RefSlot, Removal};
use crate::edit::logger::VerbosityLevel;
use crate::undo::Mutation;
use crate::{EditError, Result};
use smallvec::SmallVec;

fn invalid(msg: impl Into<String>) -> EditError {
    EditError::InvalidInput(msg.into())
}

fn not_applied(what: &str) -> EditError {
    EditError::IntegrityViolation(format!("{what}: revert called before apply"))
}

/// Check that `target` is present
fn require(doc: &MapDocument, target: EntityRef) -> Result<()> {
    if doc.contains(target) {
        Ok(())
    } else {
        Err(EditError::EntityNotFound(target))
    }
}

/// Validate a brand-new entity against the document
fn validate_new_entity(doc: &MapDocument, entity: &Entity) -> Result<()> {
    let key = entity.entity_ref();
    match entity {
        Entity::Waypoint(w) => {
            let n = w.id.as_u32();
            if n >= doc.config.max_waypoints {
                return Err(invalid(format!(
                    "waypoint {n} is out of range (max {})",
                    doc.config.max_waypoints.saturating_sub(1)
                )));
            }
            if doc.contains(key) {
                return Err(EditError::DuplicateWaypoint(n));
            }
        }
        _ if doc.contains(key) => {
            return Err(invalid(format!("{key} already exists")));
        }
        _ => {}
    }

    match entity {
        Entity::House(h) => {
            if h.name.trim().is_empty() {
                return Err(invalid("house name is empty"));
            }
            if doc.house_by_name(&h.name).is_some() {
                return Err(invalid(format!("house '{}' already exists", h.name)));
            }
            if let Some(ht) = h.house_type {
                require(doc, EntityRef::HouseType(ht))?;
            }
        }
        Entity::TaskForce(tf) => {
            if tf.entries.len() > doc.config.max_task_force_slots {
                return Err(invalid(format!(
                    "task force has {} slots (max {})",
                    tf.entries.len(),
                    doc.config.max_task_force_slots
                )));
            }
        }
        Entity::Script(s) => {
            if s.actions.len() > doc.config.max_script_actions {
                return Err(invalid(format!(
                    "script has {} actions (max {})",
                    s.actions.len(),
                    doc.config.max_script_actions
                )));
            }
        }
        Entity::TeamType(t) => {
            let refs = [
                t.task_force.map(EntityRef::TaskForce),
                t.script.map(EntityRef::Script),
                t.tag.map(EntityRef::Tag),
                t.house_type.map(EntityRef::HouseType),
                t.waypoint.map(EntityRef::Waypoint),
                t.transport_waypoint.map(EntityRef::Waypoint),
            ];
            for r in refs.into_iter().flatten() {
                require(doc, r)?;
            }
        }
        Entity::Trigger(t) => {
            if let Some(attached) = t.attached {
                if attached != t.id {
                    require(doc, EntityRef::Trigger(attached))?;
                }
            }
        }
        Entity::Tag(t) => require(doc, EntityRef::Trigger(t.trigger))?,
        Entity::AiTrigger(ai) => {
            for team in [ai.primary_team, ai.secondary_team].into_iter().flatten() {
                require(doc, EntityRef::TeamType(team))?;
            }
        }
        Entity::LocalVariable(v) => {
            if v.name.trim().is_empty() {
                return Err(invalid("local variable name is empty"));
            }
        }
        Entity::HouseType(_) | Entity::Waypoint(_) => {}
    }
    Ok(())
}

/// Add one entity to its collection
///
/// Reverting removes it again. Any reference that was attached to it
/// outside the history (direct field edits) is cleared on revert and put
/// back on redo.
#[derive(Debug)]
pub struct AddEntity {
    entity: Entity,
    label: String,
    undone: Option<Removal>,
}

impl AddEntity {
    pub fn new(doc: &MapDocument, entity: Entity) -> Result<Self> {
        validate_new_entity(doc, &entity)?;
        // Ids chosen by the caller must never be handed out later
        if let Some(id) = entity.entity_ref().entity_id() {
            doc.allocator.seed(id);
        }
        let label = format!("Add {} '{}'", entity.kind(), entity.display_name());
        Ok(AddEntity {
            entity,
            label,
            undone: None,
        })
    }

    /// Copy an existing entity under a fresh id (or next free index) and name
    ///
    /// Waypoints cannot be cloned; they are placed, not copied.
    pub fn clone_of(doc: &MapDocument, source: EntityRef, new_name: &str) -> Result<Self> {
        let mut entity = doc
            .get_entity(source)
            .ok_or(EditError::EntityNotFound(source))?;
        match &mut entity {
            Entity::Waypoint(_) => return Err(invalid("waypoints cannot be cloned")),
            Entity::LocalVariable(v) => {
                v.index = doc
                    .local_variables
                    .keys()
                    .next_back()
                    .map_or(0, |last| last + 1);
            }
            Entity::House(h) => {
                // A copied house gets its own alliance list head
                let old = h.name.clone();
                h.alliances.retain(|a| *a != old);
                h.alliances.insert(0, new_name.to_string());
            }
            _ => {}
        }
        entity.set_id(doc.allocator.allocate());
        entity.set_name(new_name.to_string());
        Self::new(doc, entity)
    }

    pub fn target(&self) -> EntityRef {
        self.entity.entity_ref()
    }
}

impl Mutation for AddEntity {
    fn apply(&mut self, doc: &mut MapDocument) -> Result<()> {
        match self.undone.take() {
            Some(removal) => integrity::undo_removal(doc, &removal)?,
            None => doc.insert_entity(self.entity.clone())?,
        }
        doc.logger
            .categorized(VerbosityLevel::Verbose, "edit", &format!("Added {}", self.target()));
        Ok(())
    }

    fn revert(&mut self, doc: &mut MapDocument) -> Result<()> {
        let removal = integrity::delete_with_cascade(doc, self.target(), false)?;
        self.undone = Some(removal);
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Delete an entity, clearing every reference to it first
///
/// Houses take their exclusively owned house type with them; triggers take
/// their tags.
#[derive(Debug)]
pub struct DeleteEntity {
    target: EntityRef,
    label: String,
    removal: Option<Removal>,
}

impl DeleteEntity {
    pub fn new(doc: &MapDocument, target: EntityRef) -> Result<Self> {
        integrity::check_deletable(doc, target)?;
        let name = doc.entity_name(target).unwrap_or_default();
        Ok(DeleteEntity {
            target,
            label: format!("Delete {} '{}'", target.kind(), name),
            removal: None,
        })
    }

    /// What the last apply removed (target first for houses, last for triggers)
    pub fn removal(&self) -> Option<&Removal> {
        self.removal.as_ref()
    }
}

impl Mutation for DeleteEntity {
    fn apply(&mut self, doc: &mut MapDocument) -> Result<()> {
        let removal = integrity::delete_with_cascade(doc, self.target, true)?;
        doc.logger.categorized(
            VerbosityLevel::Verbose,
            "edit",
            &format!(
                "Deleted {} entities, cleared {} references",
                removal.steps.len(),
                removal.cleared_count()
            ),
        );
        self.removal = Some(removal);
        Ok(())
    }

    fn revert(&mut self, doc: &mut MapDocument) -> Result<()> {
        let removal = self.removal.take().ok_or_else(|| not_applied(&self.label))?;
        integrity::undo_removal(doc, &removal)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Rename a house and rewrite its own alliance-list entry
///
/// Other entities that mention the old name keep it.
#[derive(Debug)]
pub struct RenameHouse {
    house: EntityId,
    old_name: String,
    new_name: String,
    old_alliances: Vec<String>,
}

impl RenameHouse {
    pub fn new(doc: &MapDocument, house: EntityId, new_name: impl Into<String>) -> Result<Self> {
        let new_name = new_name.into();
        let current = doc
            .houses
            .get(house)
            .ok_or(EditError::EntityNotFound(EntityRef::House(house)))?;
        if new_name.trim().is_empty() {
            return Err(invalid("house name is empty"));
        }
        if let Some(existing) = doc.house_by_name(&new_name) {
            if existing.id != house {
                return Err(invalid(format!("house '{new_name}' already exists")));
            }
        }
        Ok(RenameHouse {
            house,
            old_name: current.name.clone(),
            new_name,
            old_alliances: current.alliances.clone(),
        })
    }
}

impl Mutation for RenameHouse {
    fn apply(&mut self, doc: &mut MapDocument) -> Result<()> {
        let target = EntityRef::House(self.house);
        let house = doc
            .houses
            .get_mut(self.house)
            .ok_or(EditError::EntityNotFound(target))?;
        self.old_alliances = house.alliances.clone();
        house.name = self.new_name.clone();
        integrity::on_entity_renamed(doc, target, &self.old_name, &self.new_name)
    }

    fn revert(&mut self, doc: &mut MapDocument) -> Result<()> {
        let house = doc
            .houses
            .get_mut(self.house)
            .ok_or(EditError::EntityNotFound(EntityRef::House(self.house)))?;
        house.name = self.old_name.clone();
        house.alliances = self.old_alliances.clone();
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Rename house '{}' to '{}'", self.old_name, self.new_name)
    }
}

/// Attach or detach one id reference field
#[derive(Debug)]
pub struct SetReference {
    slot: RefSlot,
    value: Option<EntityRef>,
    previous: Option<Option<EntityRef>>,
}

impl SetReference {
    pub fn new(doc: &MapDocument, slot: RefSlot, value: Option<EntityRef>) -> Result<Self> {
        require(doc, slot.holder())?;
        if let Some(v) = value {
            if v.kind() != slot.target_kind() {
                return Err(invalid(format!("{slot} cannot hold {v}")));
            }
            require(doc, v)?;
        }
        Ok(SetReference {
            slot,
            value,
            previous: None,
        })
    }

    pub fn detach(doc: &MapDocument, slot: RefSlot) -> Result<Self> {
        Self::new(doc, slot, None)
    }
}

impl Mutation for SetReference {
    fn apply(&mut self, doc: &mut MapDocument) -> Result<()> {
        if let Some(v) = self.value {
            if !doc.contains(v) {
                return Err(EditError::IntegrityViolation(format!(
                    "{} would point at missing {v}",
                    self.slot
                )));
            }
        }
        self.previous = Some(self.slot.get(doc)?);
        self.slot.set(doc, self.value)
    }

    fn revert(&mut self, doc: &mut MapDocument) -> Result<()> {
        let previous = self.previous.take().ok_or_else(|| not_applied("set reference"))?;
        self.slot.set(doc, previous)
    }

    fn describe(&self) -> String {
        match self.value {
            Some(v) => format!("Set {} to {v}", self.slot),
            None => format!("Clear {}", self.slot),
        }
    }
}

/// Roster edit on a task force
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOp {
    Insert { index: usize, entry: TaskForceEntry },
    Remove { index: usize },
    Move { from: usize, to: usize },
    /// Duplicate the entry at `index` right after itself
    CloneInPlace { index: usize },
    Replace { index: usize, entry: TaskForceEntry },
}

/// Apply `op` to an ordered list; indices must already be validated
fn apply_list_op<T: Clone>(list: &mut SmallVec<[T; 6]>, op: ListOp<T>) {
    match op {
        ListOp::Insert(index, item) => list.insert(index, item),
        ListOp::Remove(index) => {
            list.remove(index);
        }
        ListOp::Move(from, to) => {
            let item = list.remove(from);
            list.insert(to, item);
        }
        ListOp::Duplicate(index) => {
            let item = list[index].clone();
            list.insert(index + 1, item);
        }
        ListOp::Replace(index, item) => list[index] = item,
    }
}

/// Kind-agnostic form of an ordered-list edit
enum ListOp<T> {
    Insert(usize, T),
    Remove(usize),
    Move(usize, usize),
    Duplicate(usize),
    Replace(usize, T),
}

/// Bounds-check a list edit; `grows` edits need a free slot
fn validate_list_op(len: usize, max: usize, index_ok: &[usize], insert_at: Option<usize>, grows: bool) -> Result<()> {
    if grows && len >= max {
        return Err(invalid(format!("list is full ({max} entries)")));
    }
    if let Some(at) = insert_at {
        if at > len {
            return Err(invalid(format!("insert position {at} is past the end ({len})")));
        }
    }
    for &i in index_ok {
        if i >= len {
            return Err(invalid(format!("index {i} is out of range ({len})")));
        }
    }
    Ok(())
}

#[derive(Debug)]
pub struct EditTaskForce {
    task_force: EntityId,
    op: EntryOp,
    before: Option<SmallVec<[TaskForceEntry; 6]>>,
}

impl EditTaskForce {
    pub fn new(doc: &MapDocument, task_force: EntityId, op: EntryOp) -> Result<Self> {
        let tf = doc
            .task_forces
            .get(task_force)
            .ok_or(EditError::EntityNotFound(EntityRef::TaskForce(task_force)))?;
        let len = tf.entries.len();
        let max = doc.config.max_task_force_slots;
        match &op {
            EntryOp::Insert { index, entry } => {
                if entry.count == 0 {
                    return Err(invalid("unit count must be at least 1"));
                }
                validate_list_op(len, max, &[], Some(*index), true)?
            }
            EntryOp::Remove { index } => validate_list_op(len, max, &[*index], None, false)?,
            EntryOp::Move { from, to } => validate_list_op(len, max, &[*from, *to], None, false)?,
            EntryOp::CloneInPlace { index } => validate_list_op(len, max, &[*index], None, true)?,
            EntryOp::Replace { index, entry } => {
                if entry.count == 0 {
                    return Err(invalid("unit count must be at least 1"));
                }
                validate_list_op(len, max, &[*index], None, false)?
            }
        }
        Ok(EditTaskForce {
            task_force,
            op,
            before: None,
        })
    }
}

impl Mutation for EditTaskForce {
    fn apply(&mut self, doc: &mut MapDocument) -> Result<()> {
        let tf = doc
            .task_forces
            .get_mut(self.task_force)
            .ok_or(EditError::EntityNotFound(EntityRef::TaskForce(self.task_force)))?;
        self.before = Some(tf.entries.clone());
        let op = match self.op.clone() {
            EntryOp::Insert { index, entry } => ListOp::Insert(index, entry),
            EntryOp::Remove { index } => ListOp::Remove(index),
            EntryOp::Move { from, to } => ListOp::Move(from, to),
            EntryOp::CloneInPlace { index } => ListOp::Duplicate(index),
            EntryOp::Replace { index, entry } => ListOp::Replace(index, entry),
        };
        apply_list_op(&mut tf.entries, op);
        Ok(())
    }

    fn revert(&mut self, doc: &mut MapDocument) -> Result<()> {
        let before = self.before.take().ok_or_else(|| not_applied("task force edit"))?;
        let tf = doc
            .task_forces
            .get_mut(self.task_force)
            .ok_or(EditError::EntityNotFound(EntityRef::TaskForce(self.task_force)))?;
        tf.entries = before;
        Ok(())
    }

    fn describe(&self) -> String {
        let what = match &self.op {
            EntryOp::Insert { entry, .. } => format!("add {} x{}", entry.unit_type, entry.count),
            EntryOp::Remove { index } => format!("remove slot {index}"),
            EntryOp::Move { from, to } => format!("move slot {from} to {to}"),
            EntryOp::CloneInPlace { index } => format!("duplicate slot {index}"),
            EntryOp::Replace { index, entry } => {
                format!("set slot {index} to {} x{}", entry.unit_type, entry.count)
            }
        };
        format!("Task force {}: {what}", self.task_force)
    }
}

/// Action-list edit on a script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOp {
    Insert { index: usize, action: ScriptAction },
    Remove { index: usize },
    Move { from: usize, to: usize },
    Replace { index: usize, action: ScriptAction },
}

#[derive(Debug)]
pub struct EditScript {
    script: EntityId,
    op: ScriptOp,
    before: Option<Vec<ScriptAction>>,
}

impl EditScript {
    pub fn new(doc: &MapDocument, script: EntityId, op: ScriptOp) -> Result<Self> {
        let s = doc
            .scripts
            .get(script)
            .ok_or(EditError::EntityNotFound(EntityRef::Script(script)))?;
        let len = s.actions.len();
        let max = doc.config.max_script_actions;
        match op {
            ScriptOp::Insert { index, .. } => validate_list_op(len, max, &[], Some(index), true)?,
            ScriptOp::Remove { index } | ScriptOp::Replace { index, .. } => {
                validate_list_op(len, max, &[index], None, false)?
            }
            ScriptOp::Move { from, to } => validate_list_op(len, max, &[from, to], None, false)?,
        }
        Ok(EditScript {
            script,
            op,
            before: None,
        })
    }
}

impl Mutation for EditScript {
    fn apply(&mut self, doc: &mut MapDocument) -> Result<()> {
        let s = doc
            .scripts
            .get_mut(self.script)
            .ok_or(EditError::EntityNotFound(EntityRef::Script(self.script)))?;
        self.before = Some(s.actions.clone());
        match self.op {
            ScriptOp::Insert { index, action } => s.actions.insert(index, action),
            ScriptOp::Remove { index } => {
                s.actions.remove(index);
            }
            ScriptOp::Move { from, to } => {
                let action = s.actions.remove(from);
                s.actions.insert(to, action);
            }
            ScriptOp::Replace { index, action } => s.actions[index] = action,
        }
        Ok(())
    }

    fn revert(&mut self, doc: &mut MapDocument) -> Result<()> {
        let before = self.before.take().ok_or_else(|| not_applied("script edit"))?;
        let s = doc
            .scripts
            .get_mut(self.script)
            .ok_or(EditError::EntityNotFound(EntityRef::Script(self.script)))?;
        s.actions = before;
        Ok(())
    }

    fn describe(&self) -> String {
        let what = match self.op {
            ScriptOp::Insert { action, .. } => {
                format!("add action {} ({})", action.action, action.argument)
            }
            ScriptOp::Remove { index } => format!("remove line {index}"),
            ScriptOp::Move { from, to } => format!("move line {from} to {to}"),
            ScriptOp::Replace { index, action } => {
                format!("set line {index} to {} ({})", action.action, action.argument)
            }
        };
        format!("Script {}: {what}", self.script)
    }
}

/// Move a waypoint to another cell
#[derive(Debug)]
pub struct MoveWaypoint {
    waypoint: WaypointId,
    to: MapCell,
    from: Option<MapCell>,
}

impl MoveWaypoint {
    pub fn new(doc: &MapDocument, waypoint: WaypointId, to: MapCell) -> Result<Self> {
        require(doc, EntityRef::Waypoint(waypoint))?;
        Ok(MoveWaypoint {
            waypoint,
            to,
            from: None,
        })
    }
}

impl Mutation for MoveWaypoint {
    fn apply(&mut self, doc: &mut MapDocument) -> Result<()> {
        let wp = doc
            .waypoints
            .get_mut(&self.waypoint.as_u32())
            .ok_or(EditError::EntityNotFound(EntityRef::Waypoint(self.waypoint)))?;
        self.from = Some(wp.cell);
        wp.cell = self.to;
        Ok(())
    }

    fn revert(&mut self, doc: &mut MapDocument) -> Result<()> {
        let from = self.from.take().ok_or_else(|| not_applied("move waypoint"))?;
        let wp = doc
            .waypoints
            .get_mut(&self.waypoint.as_u32())
            .ok_or(EditError::EntityNotFound(EntityRef::Waypoint(self.waypoint)))?;
        wp.cell = from;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Move waypoint {} to {}", self.waypoint, self.to)
    }
}

/// Several mutations recorded as one history entry
///
/// Applied in order, reverted in reverse order. If one member fails to
/// apply, the members already applied are reverted before the error is
/// returned.
pub struct Batch {
    label: String,
    mutations: Vec<Box<dyn Mutation>>,
}

impl Batch {
    pub fn new(label: impl Into<String>) -> Self {
        Batch {
            label: label.into(),
            mutations: Vec::new(),
        }
    }

    pub fn push(&mut self, mutation: Box<dyn Mutation>) {
        self.mutations.push(mutation);
    }

    pub fn with(mut self, mutation: Box<dyn Mutation>) -> Self {
        self.push(mutation);
        self
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

impl Mutation for Batch {
    fn apply(&mut self, doc: &mut MapDocument) -> Result<()> {
        for i in 0..self.mutations.len() {
            if let Err(e) = self.mutations[i].apply(doc) {
                for done in self.mutations[..i].iter_mut().rev() {
                    if let Err(rollback) = done.revert(doc) {
                        return Err(integrity::rollback_failed(&self.label, e, rollback));
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn revert(&mut self, doc: &mut MapDocument) -> Result<()> {
        for m in self.mutations.iter_mut().rev() {
            m.revert(doc)?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

impl std::fmt::Debug for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("label", &self.label)
            .field("len", &self.mutations.len())
            .finish()
    }
}

type BuildMutation = Box<dyn FnOnce(&MapDocument) -> Result<Box<dyn Mutation>>>;

/// A mutation constructed from the document as it is when first applied
///
/// Inside a `Batch`, a later member often depends on an earlier one (a house
/// using the house type added just before it). Validating that member
/// against the document before the batch runs would fail, so its
/// constructor runs here instead, right before its first `apply`. Redo
/// re-applies the mutation built the first time.
pub struct Deferred {
    label: String,
    build: Option<BuildMutation>,
    built: Option<Box<dyn Mutation>>,
}

impl Deferred {
    pub fn new<F>(label: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&MapDocument) -> Result<Box<dyn Mutation>> + 'static,
    {
        Deferred {
            label: label.into(),
            build: Some(Box::new(build)),
            built: None,
        }
    }

    /// `AddEntity` validated at apply time
    pub fn add(entity: Entity) -> Self {
        let label = format!("Add {} '{}'", entity.kind(), entity.display_name());
        Self::new(label, move |doc| {
            Ok(Box::new(AddEntity::new(doc, entity)?) as Box<dyn Mutation>)
        })
    }

    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }
}

impl Mutation for Deferred {
    fn apply(&mut self, doc: &mut MapDocument) -> Result<()> {
        if self.built.is_none() {
            let build = self.build.take().ok_or_else(|| {
                EditError::IntegrityViolation(format!(
                    "{}: construction already failed",
                    self.label
                ))
            })?;
            self.built = Some(build(doc)?);
        }
        match self.built.as_mut() {
            Some(m) => m.apply(doc),
            None => Err(not_applied(&self.label)),
        }
    }

    fn revert(&mut self, doc: &mut MapDocument) -> Result<()> {
        self.built
            .as_mut()
            .ok_or_else(|| not_applied(&self.label))?
            .revert(doc)
    }

    fn describe(&self) -> String {
        match &self.built {
            Some(m) => m.describe(),
            None => self.label.clone(),
        }
    }
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("label", &self.label)
            .field("built", &self.built.is_some())
            .finish()
    }
}

/// "New house" command: a house type plus the house using it, one undo step
///
/// Everything that can be checked up front is checked here. The house
/// itself is validated when the batch applies, after its type exists.
pub fn new_house(doc: &MapDocument, country: HouseType, house: House) -> Result<Batch> {
    if house.house_type != Some(country.id) {
        return Err(invalid(format!(
            "house '{}' must use the new house type '{}'",
            house.name, country.name
        )));
    }
    if house.id == country.id {
        return Err(invalid(format!("{} is used twice", house.id)));
    }
    let mut detached = house.clone();
    detached.house_type = None;
    validate_new_entity(doc, &Entity::House(detached))?;

    let add_country = AddEntity::new(doc, Entity::HouseType(country))?;
    doc.allocator.seed(house.id);
    let label = format!("New house '{}'", house.name);
    Ok(Batch::new(label)
        .with(Box::new(add_country))
        .with(Box::new(Deferred::add(Entity::House(house)))))
}

/// First free "<base> Clone", "<base> Clone 2", ... name in a collection
pub fn unused_clone_name<T: DocEntity>(store: &crate::core::EntityStore<T>, base: &str) -> String {
    let first = format!("{base} Clone");
    if store.find_by_name(&first).is_none() {
        return first;
    }
    (2..)
        .map(|n| format!("{base} Clone {n}"))
        .find(|name| store.find_by_name(name).is_none())
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        AiTriggerType, House, HouseType, LocalVariable, Script, TaskForce, TeamType, Waypoint,
    };
    use crate::undo::MutationEngine;
    use similar_asserts::assert_eq;

    fn add(doc: &mut MapDocument, engine: &mut MutationEngine, entity: Entity) -> EntityRef {
        let m = AddEntity::new(doc, entity).unwrap();
        let target = m.target();
        engine.perform(doc, Box::new(m)).unwrap();
        target
    }

    #[test]
    fn test_add_then_undo_restores_empty_document() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let before = doc.clone();

        let id = doc.allocator.allocate();
        add(&mut doc, &mut engine, Entity::TaskForce(TaskForce::new(id, "TF1")));
        assert_eq!(doc.task_forces.len(), 1);

        engine.undo_one(&mut doc).unwrap();
        assert_eq!(doc, before);
        engine.redo_one(&mut doc).unwrap();
        assert!(doc.task_forces.contains(id));
    }

    #[test]
    fn test_duplicate_waypoint_rejected_before_perform() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        add(
            &mut doc,
            &mut engine,
            Entity::Waypoint(Waypoint::new(5, MapCell::new(1, 1))),
        );

        let err = AddEntity::new(&doc, Entity::Waypoint(Waypoint::new(5, MapCell::new(9, 9))));
        assert!(matches!(err, Err(EditError::DuplicateWaypoint(5))));
        assert_eq!(engine.undo_count(), 1);
    }

    #[test]
    fn test_out_of_range_waypoint_rejected() {
        let doc = MapDocument::new();
        let max = doc.config.max_waypoints;
        let err = AddEntity::new(&doc, Entity::Waypoint(Waypoint::new(max, MapCell::new(0, 0))));
        assert!(matches!(err, Err(EditError::InvalidInput(_))));
    }

    #[test]
    fn test_delete_team_type_clears_ai_trigger_and_undo_restores() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let team = doc.allocator.allocate();
        let ai = doc.allocator.allocate();
        add(&mut doc, &mut engine, Entity::TeamType(TeamType::new(team, "TT1")));
        add(
            &mut doc,
            &mut engine,
            Entity::AiTrigger(AiTriggerType::new(ai, "AI1", "<all>").with_primary(team)),
        );
        let before = doc.clone();

        let del = DeleteEntity::new(&doc, EntityRef::TeamType(team)).unwrap();
        engine.perform(&mut doc, Box::new(del)).unwrap();
        assert!(!doc.team_types.contains(team));
        assert_eq!(doc.ai_triggers.get(ai).unwrap().primary_team, None);

        engine.undo_one(&mut doc).unwrap();
        assert_eq!(doc, before);
        assert_eq!(doc.ai_triggers.get(ai).unwrap().primary_team, Some(team));
    }

    #[test]
    fn test_undo_add_clears_out_of_history_reference() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let team = doc.allocator.allocate();
        let tf = doc.allocator.allocate();
        add(&mut doc, &mut engine, Entity::TeamType(TeamType::new(team, "TT1")));
        add(&mut doc, &mut engine, Entity::TaskForce(TaskForce::new(tf, "TF1")));

        // Direct field edit, outside the history
        doc.team_types.get_mut(team).unwrap().task_force = Some(tf);

        engine.undo_one(&mut doc).unwrap();
        assert_eq!(doc.team_types.get(team).unwrap().task_force, None);
        doc.check_integrity().unwrap();

        engine.redo_one(&mut doc).unwrap();
        assert_eq!(doc.team_types.get(team).unwrap().task_force, Some(tf));
    }

    #[test]
    fn test_delete_shared_house_type_rejected() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let ht = doc.allocator.allocate();
        add(&mut doc, &mut engine, Entity::HouseType(HouseType::new(ht, "Americans", 0)));
        let h = doc.allocator.allocate();
        add(
            &mut doc,
            &mut engine,
            Entity::House(House::new(h, "Americans House").with_house_type(ht)),
        );
        assert!(DeleteEntity::new(&doc, EntityRef::HouseType(ht)).is_err());

        let del = DeleteEntity::new(&doc, EntityRef::House(h)).unwrap();
        engine.perform(&mut doc, Box::new(del)).unwrap();
        assert!(doc.house_types.is_empty());
        engine.undo_one(&mut doc).unwrap();
        assert!(doc.house_types.contains(ht));
        assert_eq!(doc.houses.get(h).unwrap().house_type, Some(ht));
    }

    #[test]
    fn test_rename_house_round_trip() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let h = doc.allocator.allocate();
        add(&mut doc, &mut engine, Entity::House(House::new(h, "Old")));
        let before = doc.clone();

        let rename = RenameHouse::new(&doc, h, "New").unwrap();
        engine.perform(&mut doc, Box::new(rename)).unwrap();
        let house = doc.houses.get(h).unwrap();
        assert_eq!(house.name, "New");
        assert_eq!(house.alliances, vec!["New".to_string()]);

        engine.undo_one(&mut doc).unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn test_rename_to_existing_house_rejected() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let a = doc.allocator.allocate();
        let b = doc.allocator.allocate();
        add(&mut doc, &mut engine, Entity::House(House::new(a, "A")));
        add(&mut doc, &mut engine, Entity::House(House::new(b, "B")));
        assert!(RenameHouse::new(&doc, a, "B").is_err());
        assert!(RenameHouse::new(&doc, a, "A").is_ok());
    }

    #[test]
    fn test_set_reference_attach_detach() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let team = doc.allocator.allocate();
        let tf = doc.allocator.allocate();
        add(&mut doc, &mut engine, Entity::TeamType(TeamType::new(team, "TT")));
        add(&mut doc, &mut engine, Entity::TaskForce(TaskForce::new(tf, "TF")));

        let slot = RefSlot::TeamTaskForce(team);
        let attach = SetReference::new(&doc, slot, Some(EntityRef::TaskForce(tf))).unwrap();
        engine.perform(&mut doc, Box::new(attach)).unwrap();
        assert_eq!(doc.team_types.get(team).unwrap().task_force, Some(tf));

        let detach = SetReference::detach(&doc, slot).unwrap();
        engine.perform(&mut doc, Box::new(detach)).unwrap();
        assert_eq!(doc.team_types.get(team).unwrap().task_force, None);

        engine.undo_up_to(&mut doc, 2).unwrap();
        assert_eq!(doc.team_types.get(team).unwrap().task_force, None);
        engine.redo_one(&mut doc).unwrap();
        assert_eq!(doc.team_types.get(team).unwrap().task_force, Some(tf));

        // Target must exist and be of the right kind
        let missing = doc.allocator.allocate();
        assert!(SetReference::new(&doc, slot, Some(EntityRef::TaskForce(missing))).is_err());
        assert!(SetReference::new(&doc, slot, Some(EntityRef::TeamType(team))).is_err());
    }

    #[test]
    fn test_task_force_entry_ops() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let tf = doc.allocator.allocate();
        add(
            &mut doc,
            &mut engine,
            Entity::TaskForce(TaskForce::new(tf, "TF").with_entry("E1", 3).with_entry("MTNK", 2)),
        );
        let before = doc.clone();

        let ops = [
            EntryOp::CloneInPlace { index: 0 },
            EntryOp::Move { from: 0, to: 2 },
            EntryOp::Insert {
                index: 1,
                entry: TaskForceEntry::new("HTK", 1),
            },
            EntryOp::Remove { index: 0 },
        ];
        for op in ops {
            let m = EditTaskForce::new(&doc, tf, op).unwrap();
            engine.perform(&mut doc, Box::new(m)).unwrap();
        }
        let units: Vec<&str> = doc
            .task_forces
            .get(tf)
            .unwrap()
            .entries
            .iter()
            .map(|e| e.unit_type.as_str())
            .collect();
        assert_eq!(units, vec!["HTK", "MTNK", "E1"]);

        engine.undo_up_to(&mut doc, 4).unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn test_task_force_slot_limit() {
        let mut doc = MapDocument::new();
        doc.config.max_task_force_slots = 2;
        let mut engine = MutationEngine::new();
        let tf = doc.allocator.allocate();
        add(
            &mut doc,
            &mut engine,
            Entity::TaskForce(TaskForce::new(tf, "TF").with_entry("E1", 3).with_entry("E2", 1)),
        );
        assert!(EditTaskForce::new(&doc, tf, EntryOp::CloneInPlace { index: 0 }).is_err());
        assert!(EditTaskForce::new(&doc, tf, EntryOp::Remove { index: 2 }).is_err());
        assert!(EditTaskForce::new(&doc, tf, EntryOp::Remove { index: 1 }).is_ok());
    }

    #[test]
    fn test_script_ops_round_trip() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let s = doc.allocator.allocate();
        add(
            &mut doc,
            &mut engine,
            Entity::Script(Script::new(s, "S").with_action(3, 4).with_action(58, 1)),
        );
        let before = doc.clone();

        let ins = EditScript::new(
            &doc,
            s,
            ScriptOp::Insert {
                index: 2,
                action: ScriptAction::new(16, 7),
            },
        )
        .unwrap();
        engine.perform(&mut doc, Box::new(ins)).unwrap();
        let mv = EditScript::new(&doc, s, ScriptOp::Move { from: 2, to: 0 }).unwrap();
        engine.perform(&mut doc, Box::new(mv)).unwrap();
        assert_eq!(doc.scripts.get(s).unwrap().actions[0], ScriptAction::new(16, 7));

        engine.undo_up_to(&mut doc, 2).unwrap();
        assert_eq!(doc, before);
        assert!(EditScript::new(&doc, s, ScriptOp::Insert {
            index: 5,
            action: ScriptAction::new(1, 0)
        })
        .is_err());
    }

    #[test]
    fn test_move_waypoint() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        add(
            &mut doc,
            &mut engine,
            Entity::Waypoint(Waypoint::new(0, MapCell::new(1, 1))),
        );
        let m = MoveWaypoint::new(&doc, WaypointId::new(0), MapCell::new(30, 40)).unwrap();
        engine.perform(&mut doc, Box::new(m)).unwrap();
        assert_eq!(doc.waypoints[&0].cell, MapCell::new(30, 40));
        engine.undo_one(&mut doc).unwrap();
        assert_eq!(doc.waypoints[&0].cell, MapCell::new(1, 1));
    }

    #[test]
    fn test_batch_is_one_history_entry() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let tf = doc.allocator.allocate();
        let team = doc.allocator.allocate();

        let add_tf = AddEntity::new(&doc, Entity::TaskForce(TaskForce::new(tf, "TF"))).unwrap();
        let add_team = AddEntity::new(&doc, Entity::TeamType(TeamType::new(team, "TT"))).unwrap();
        let batch = Batch::new("New team")
            .with(Box::new(add_tf))
            .with(Box::new(add_team));
        engine.perform(&mut doc, Box::new(batch)).unwrap();

        assert_eq!(engine.undo_history(), vec!["New team"]);
        assert_eq!(doc.task_forces.len() + doc.team_types.len(), 2);
        engine.undo_one(&mut doc).unwrap();
        assert!(doc.task_forces.is_empty() && doc.team_types.is_empty());
    }

    #[test]
    fn test_batch_rolls_back_on_failure() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let tf = doc.allocator.allocate();

        let first = AddEntity::new(&doc, Entity::TaskForce(TaskForce::new(tf, "TF"))).unwrap();
        let second = AddEntity::new(&doc, Entity::TaskForce(TaskForce::new(tf, "TF again"))).unwrap();
        let batch = Batch::new("Broken").with(Box::new(first)).with(Box::new(second));

        assert!(engine.perform(&mut doc, Box::new(batch)).is_err());
        assert!(doc.task_forces.is_empty());
        assert_eq!(engine.undo_count(), 0);
    }

    #[test]
    fn test_clone_of_allocates_fresh_id() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let tf = doc.allocator.allocate();
        add(
            &mut doc,
            &mut engine,
            Entity::TaskForce(TaskForce::new(tf, "TF").with_entry("E1", 2)),
        );
        let name = unused_clone_name(&doc.task_forces, "TF");
        assert_eq!(name, "TF Clone");

        let m = AddEntity::clone_of(&doc, EntityRef::TaskForce(tf), &name).unwrap();
        let target = m.target();
        engine.perform(&mut doc, Box::new(m)).unwrap();

        assert_ne!(target, EntityRef::TaskForce(tf));
        let copy = doc.task_forces.find_by_name("TF Clone").unwrap();
        assert_eq!(copy.entries, doc.task_forces.get(tf).unwrap().entries);
        assert_eq!(unused_clone_name(&doc.task_forces, "TF"), "TF Clone 2");
    }

    #[test]
    fn test_clone_local_variable_takes_next_index() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        add(
            &mut doc,
            &mut engine,
            Entity::LocalVariable(LocalVariable::new(3, "alarm", 0)),
        );
        let m = AddEntity::clone_of(&doc, EntityRef::LocalVariable(3), "alarm 2").unwrap();
        assert_eq!(m.target(), EntityRef::LocalVariable(4));
    }

    #[test]
    fn test_caller_chosen_id_is_never_reissued() {
        let doc = MapDocument::new();
        let id = EntityId::new(5_000_000);
        AddEntity::new(&doc, Entity::Script(Script::new(id, "S"))).unwrap();
        assert!(doc.allocator.allocate() > id);
    }

    #[test]
    fn test_new_house_is_one_undo_step() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let before = doc.clone();
        let ht = doc.allocator.allocate();
        let house = doc.allocator.allocate();

        // The house alone cannot be validated until its type exists
        let early = AddEntity::new(
            &doc,
            Entity::House(House::new(house, "Greece").with_house_type(ht)),
        );
        assert!(matches!(
            early,
            Err(EditError::EntityNotFound(EntityRef::HouseType(_)))
        ));

        let batch = new_house(
            &doc,
            HouseType::new(ht, "Greece", 0),
            House::new(house, "Greece").with_house_type(ht),
        )
        .unwrap();
        engine.perform(&mut doc, Box::new(batch)).unwrap();

        assert_eq!(engine.undo_count(), 1);
        assert_eq!(engine.undo_history(), vec!["New house 'Greece'"]);
        assert_eq!(doc.houses.get(house).unwrap().house_type, Some(ht));
        assert!(doc.house_types.contains(ht));

        engine.undo_one(&mut doc).unwrap();
        assert_eq!(doc, before);

        engine.redo_one(&mut doc).unwrap();
        assert_eq!(doc.houses.get(house).unwrap().house_type, Some(ht));
        doc.check_integrity().unwrap();
    }

    #[test]
    fn test_new_house_rejects_taken_name_up_front() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let first = doc.allocator.allocate();
        add(&mut doc, &mut engine, Entity::House(House::new(first, "Greece")));

        let ht = doc.allocator.allocate();
        let house = doc.allocator.allocate();
        let err = new_house(
            &doc,
            HouseType::new(ht, "Greece", 0),
            House::new(house, "Greece").with_house_type(ht),
        );
        assert!(matches!(err, Err(EditError::InvalidInput(_))));

        let other = doc.allocator.allocate();
        let err = new_house(
            &doc,
            HouseType::new(ht, "Greece", 0),
            House::new(house, "Crete").with_house_type(other),
        );
        assert!(matches!(err, Err(EditError::InvalidInput(_))));
    }

    #[test]
    fn test_deferred_failure_rolls_back_batch() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let before = doc.clone();
        let tf = doc.allocator.allocate();
        let house = doc.allocator.allocate();
        let missing = doc.allocator.allocate();

        let batch = Batch::new("Broken")
            .with(Box::new(
                AddEntity::new(&doc, Entity::TaskForce(TaskForce::new(tf, "TF"))).unwrap(),
            ))
            .with(Box::new(Deferred::add(Entity::House(
                House::new(house, "Nowhere").with_house_type(missing),
            ))));

        let err = engine.perform(&mut doc, Box::new(batch));
        assert!(matches!(
            err,
            Err(EditError::EntityNotFound(EntityRef::HouseType(_)))
        ));
        assert_eq!(engine.undo_count(), 0);
        assert_eq!(doc, before);
    }

    /// Applies fine but cannot be reverted
    struct Stuck;

    impl Mutation for Stuck {
        fn apply(&mut self, _doc: &mut MapDocument) -> Result<()> {
            Ok(())
        }

        fn revert(&mut self, _doc: &mut MapDocument) -> Result<()> {
            Err(EditError::IntegrityViolation("stuck".to_string()))
        }

        fn describe(&self) -> String {
            "Stuck".to_string()
        }
    }

    #[test]
    fn test_failed_rollback_is_reported() {
        let mut doc = MapDocument::new();
        let mut engine = MutationEngine::new();
        let house = doc.allocator.allocate();
        let missing = doc.allocator.allocate();

        let batch = Batch::new("Half done").with(Box::new(Stuck)).with(Box::new(
            Deferred::add(Entity::House(
                House::new(house, "Nowhere").with_house_type(missing),
            )),
        ));

        match engine.perform(&mut doc, Box::new(batch)) {
            Err(EditError::IntegrityViolation(msg)) => {
                assert!(msg.contains("Half done"));
                assert!(msg.contains("Entity not found"));
                assert!(msg.contains("stuck"));
            }
            other => panic!("expected an integrity violation, got {other:?}"),
        }
        assert_eq!(engine.undo_count(), 0);
    }

    #[test]
    fn test_zero_waypoint_limit_rejects_without_panicking() {
        let mut doc = MapDocument::new();
        doc.config.max_waypoints = 0;
        let err = AddEntity::new(&doc, Entity::Waypoint(Waypoint::new(0, MapCell::new(0, 0))));
        assert!(matches!(err, Err(EditError::InvalidInput(_))));
    }
}
