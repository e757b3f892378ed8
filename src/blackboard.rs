use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, OnceLock, RwLock},
    time::{Duration, Instant},
};

use log::warn;
use thiserror::Error;

use crate::{
    any::{Any, AnyValue, CastError, TypeInfo},
    basic_types::FromString,
};

/// Helpers for the `{key}` pointer syntax, available on `String` and `&str`
/// alike.
pub trait BlackboardString {
    /// The inner key of a blackboard pointer. Surrounding whitespace is
    /// ignored; plain literals and empty braces resolve to `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ticktree::blackboard::BlackboardString;
    ///
    /// assert_eq!(" {target} ".strip_bb_pointer(), Some(String::from("target")));
    /// assert_eq!("{=}".strip_bb_pointer(), Some(String::from("=")));
    /// assert_eq!("target".strip_bb_pointer(), None);
    /// assert_eq!("{}".strip_bb_pointer(), None);
    /// ```
    fn strip_bb_pointer(&self) -> Option<String>;

    fn is_bb_pointer(&self) -> bool {
        self.strip_bb_pointer().is_some()
    }
}

impl<T: AsRef<str>> BlackboardString for T {
    fn strip_bb_pointer(&self) -> Option<String> {
        let trimmed = self.as_ref().trim();
        let inner = trimmed.strip_prefix('{')?.strip_suffix('}')?;
        match inner.is_empty() {
            true => None,
            false => Some(inner.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum BlackboardError {
    #[error("no entry found at key [{0}]")]
    KeyNotFound(String),
    #[error("entry [{key}] is typed [{expected}]; a value of type [{actual}] is not compatible")]
    TypeMismatch {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("entry [{key}] needs a string converter for [{to}], none registered")]
    ConverterMissing { key: String, to: String },
    #[error("entry [{0}] exists but was never written")]
    EmptyEntry(String),
    #[error("cast failed on entry [{key}]: {source}")]
    CastOutOfRange {
        key: String,
        #[source]
        source: CastError,
    },
}

fn map_cast_error(key: &str, err: CastError) -> BlackboardError {
    match err {
        CastError::MissingConverter { to } => BlackboardError::ConverterMissing {
            key: key.to_string(),
            to,
        },
        CastError::TypeMismatch { from, to } => BlackboardError::TypeMismatch {
            key: key.to_string(),
            expected: to,
            actual: from,
        },
        CastError::Empty => BlackboardError::EmptyEntry(key.to_string()),
        other => BlackboardError::CastOutOfRange {
            key: key.to_string(),
            source: other,
        },
    }
}

static STAMP_EPOCH: OnceLock<Instant> = OnceLock::new();

/// Duration since the first blackboard operation of the process. Used as the
/// write timestamp of entries.
pub fn monotonic_stamp() -> Duration {
    STAMP_EPOCH.get_or_init(Instant::now).elapsed()
}

/// A single blackboard slot: the value, its type information and the write
/// metadata used to detect updates.
#[derive(Debug)]
pub struct Entry {
    pub value: Any,
    pub info: TypeInfo,
    pub sequence_id: u64,
    pub stamp: Duration,
}

impl Entry {
    fn write(&mut self, value: Any) {
        self.value = value;
        self.sequence_id += 1;
        self.stamp = monotonic_stamp();
    }
}

/// Write metadata returned by [`Blackboard::get_stamped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStamp {
    pub sequence_id: u64,
    pub stamp: Duration,
}

pub type EntryPtr = Arc<Mutex<Entry>>;

/// Scoped access to an entry for atomic read-modify-write. The guard
/// returned by [`LockedAny::lock`] releases on every exit path.
pub struct LockedAny {
    entry: EntryPtr,
}

impl LockedAny {
    pub fn lock(&self) -> MutexGuard<'_, Entry> {
        self.entry.lock().unwrap()
    }
}

#[derive(Debug)]
pub struct BlackboardData {
    storage: HashMap<String, EntryPtr>,
    internal_to_external: HashMap<String, String>,
    auto_remapping: bool,
}

/// Shared, typed key-value store carrying data between nodes.
///
/// A `Blackboard` is a cheap handle; cloning it clones the handle, not the
/// storage. Each subtree gets its own blackboard with an optional parent.
/// Missing keys resolve through explicit remapping rules (and through the
/// parent's same-named key when auto remapping is enabled). Keys prefixed
/// with `@` always resolve on the root blackboard of the hierarchy.
///
/// Entries are created untyped and become strongly typed on the first typed
/// write or when a port declares a type for them; after that, writes must be
/// type compatible (same declared type, lossless numeric conversion, or a
/// string the entry's converter can parse).
#[derive(Debug, Clone)]
pub struct Blackboard {
    data: Arc<RwLock<BlackboardData>>,
    parent_bb: Box<Option<Blackboard>>,
}

impl Blackboard {
    fn new(parent_bb: Option<Blackboard>) -> Blackboard {
        Self {
            data: Arc::new(RwLock::new(BlackboardData {
                storage: HashMap::new(),
                internal_to_external: HashMap::new(),
                auto_remapping: false,
            })),
            parent_bb: Box::new(parent_bb),
        }
    }

    /// Creates a Blackboard with no parent.
    pub fn create() -> Blackboard {
        Self::new(None)
    }

    /// Creates a Blackboard with `parent_bb` as the parent.
    pub fn with_parent(parent_bb: &Blackboard) -> Blackboard {
        Self::new(Some(parent_bb.clone()))
    }

    pub fn parent(&self) -> Option<Blackboard> {
        self.parent_bb.as_ref().as_ref().cloned()
    }

    /// The root blackboard of the hierarchy (itself when it has no parent).
    pub fn root(&self) -> Blackboard {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Enables the Blackboard to use autoremapping when getting values from
    /// the parent Blackboard. Only used if there's no matching explicit
    /// remapping rule.
    pub fn enable_auto_remapping(&mut self, use_remapping: bool) {
        self.data.write().unwrap().auto_remapping = use_remapping;
    }

    /// Adds remapping rule for Blackboard. Maps from `internal` (this Blackboard)
    /// to `external` (a parent Blackboard)
    pub fn add_subtree_remapping(&mut self, internal: String, external: String) {
        self.data
            .write()
            .unwrap()
            .internal_to_external
            .insert(internal, external);
    }

    /// Resolve `key` to its entry, traversing remapping rules up the
    /// hierarchy. A resolved parent entry is cached locally so the next
    /// lookup is direct.
    pub fn entry(&mut self, key: &str) -> Option<EntryPtr> {
        if let Some(stripped) = key.strip_prefix('@') {
            let mut root = self.root();
            if Arc::ptr_eq(&root.data, &self.data) {
                return self.entry_local(stripped);
            }
            return root.entry(stripped);
        }
        self.entry_local(key)
    }

    fn entry_local(&mut self, key: &str) -> Option<EntryPtr> {
        // How an unknown key leaves this blackboard
        enum Redirect {
            Explicit(String),
            SameName,
        }

        // Fast path: local storage, which includes entries cached by
        // earlier traversals. Lookups only ever take the read lock; the
        // write lock is reserved for caching below.
        {
            let data = self.data.read().unwrap();
            if let Some(entry) = data.storage.get(key) {
                return Some(Arc::clone(entry));
            }
        }

        let redirect = {
            let data = self.data.read().unwrap();
            match data.internal_to_external.get(key) {
                Some(external) => Redirect::Explicit(external.clone()),
                None if data.auto_remapping => Redirect::SameName,
                None => return None,
            }
        };

        let parent = match self.parent_bb.as_mut() {
            Some(parent) => parent,
            None => return None,
        };

        match redirect {
            Redirect::Explicit(external) => {
                let entry = parent.entry(&external)?;
                self.data
                    .write()
                    .unwrap()
                    .storage
                    .insert(key.to_string(), Arc::clone(&entry));
                Some(entry)
            }
            // Auto-remapped keys are not cached: the parent stays the
            // authority on whether they exist
            Redirect::SameName => parent.entry(key),
        }
    }

    /// Create (or retrieve) the entry at `key` with the given type info,
    /// following remapping rules. Idempotent for the same type; an entry
    /// that is already strongly typed with a conflicting type is an error,
    /// except that string entries stay compatible with any typed port
    /// because the port converter parses them on read.
    pub fn create_entry(&mut self, key: &str, info: &TypeInfo) -> Result<EntryPtr, BlackboardError> {
        if let Some(stripped) = key.strip_prefix('@') {
            let mut root = self.root();
            if Arc::ptr_eq(&root.data, &self.data) {
                return self.create_entry_local(stripped, info);
            }
            return root.create_entry(stripped, info);
        }
        self.create_entry_local(key, info)
    }

    fn create_entry_local(&mut self, key: &str, info: &TypeInfo) -> Result<EntryPtr, BlackboardError> {
        let entry;

        let mut blackboard = self.data.write().unwrap();

        if let Some(existing) = blackboard.storage.get(key) {
            let existing = Arc::clone(existing);
            let mut locked = existing.lock().unwrap();
            if info.is_strongly_typed() {
                if !locked.info.is_strongly_typed() {
                    locked.info = info.clone();
                } else if locked.info.type_id() != info.type_id()
                    && locked.info.type_id() != TypeId::of::<String>()
                {
                    return Err(BlackboardError::TypeMismatch {
                        key: key.to_string(),
                        expected: locked.info.type_name().to_string(),
                        actual: info.type_name().to_string(),
                    });
                }
            }
            drop(locked);
            return Ok(existing);
        }
        // Use explicit remapping rule
        else if let Some(remapped_key) = blackboard.internal_to_external.get(key).cloned() {
            if let Some(parent) = self.parent_bb.as_mut() {
                entry = parent.create_entry(&remapped_key, info)?;
            } else {
                entry = new_entry(info);
            }
        }
        // Use autoremapping
        else if blackboard.auto_remapping && self.parent_bb.is_some() {
            entry = match self.parent_bb.as_mut() {
                Some(parent) => parent.create_entry(key, info)?,
                None => new_entry(info),
            };
        }
        // No remapping or no parent blackboard
        else {
            entry = new_entry(info);
        }

        blackboard
            .storage
            .insert(key.to_string(), Arc::clone(&entry));
        Ok(entry)
    }

    /// Sets the `value` in the Blackboard at `key`, creating the entry on
    /// first write. Fails when the entry is strongly typed and the value is
    /// not compatible. Every successful write bumps the entry's
    /// `sequence_id` and refreshes its `stamp`.
    pub fn set<T: Clone + Send + Sync + 'static>(
        &mut self,
        key: impl AsRef<str>,
        value: T,
    ) -> Result<(), BlackboardError> {
        self.set_any(key.as_ref(), Any::new(value))
    }

    /// Type-erased version of [`Blackboard::set`]; also the write path used
    /// by script assignments.
    pub fn set_any(&mut self, key: &str, value: Any) -> Result<(), BlackboardError> {
        if let Some(stripped) = key.strip_prefix('@') {
            let mut root = self.root();
            if !Arc::ptr_eq(&root.data, &self.data) {
                return root.set_any(stripped, value);
            }
            // Already at the root; fall through with the prefix removed
            return self.write_entry(stripped, value);
        }
        self.write_entry(key, value)
    }

    fn write_entry(&mut self, key: &str, value: Any) -> Result<(), BlackboardError> {
        let entry = match self.entry(key) {
            Some(entry) => entry,
            None => self.create_entry(key, &TypeInfo::any_allowed())?,
        };

        let mut locked = entry.lock().unwrap();

        if locked.info.is_strongly_typed() && value.declared().id() != locked.info.type_id() {
            // Strings are parsed through the entry's converter; numerics
            // convert when lossless.
            if let AnyValue::Str(raw) = value.value() {
                let parsed = locked
                    .info
                    .parse(raw)
                    .map_err(|e| map_cast_error(key, e))?;
                locked.write(parsed);
                return Ok(());
            }

            let declared = locked.info.declared();
            let bucket = value
                .converted_for(declared)
                .map_err(|e| map_cast_error(key, e))?;
            locked.write(Any::from_parts(bucket, declared));
            return Ok(());
        }

        if !locked.info.is_strongly_typed() && !value.is_empty() {
            // First typed write strengthens the entry
            locked.info = TypeInfo::from_declared(value.declared());
        }
        locked.write(value);
        Ok(())
    }

    /// Tries to return the value at `key`, resolving remappings. A stored
    /// string is parsed into `T` with `T::from_string`; other stored types
    /// are converted with the checked casts of [`Any::try_cast`].
    pub fn get<T>(&mut self, key: impl AsRef<str>) -> Result<T, BlackboardError>
    where
        T: Clone + Send + Sync + FromString + 'static,
    {
        let key = key.as_ref();
        let entry = self
            .entry(key)
            .ok_or_else(|| BlackboardError::KeyNotFound(key.to_string()))?;
        let locked = entry.lock().unwrap();

        if locked.value.is_empty() {
            return Err(BlackboardError::EmptyEntry(key.to_string()));
        }

        if let AnyValue::Str(raw) = locked.value.value() {
            // `json:` strings go through the registered JSON converter in
            // the cast below instead of `FromString`
            if TypeId::of::<T>() != TypeId::of::<String>() && !raw.starts_with("json:") {
                return T::from_string(raw).map_err(|_| {
                    map_cast_error(
                        key,
                        CastError::ParseError {
                            value: raw.clone(),
                            to: std::any::type_name::<T>().to_string(),
                        },
                    )
                });
            }
        }

        locked.value.try_cast::<T>().map_err(|e| map_cast_error(key, e))
    }

    /// Version of `get` that does _not_ convert: the entry must hold exactly
    /// `T` (or a numeric that was declared as `T`).
    pub fn get_exact<T>(&mut self, key: impl AsRef<str>) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entry = self.entry(key.as_ref())?;
        let locked = entry.lock().unwrap();
        if locked.value.declared().id() != TypeId::of::<T>()
            && !matches!(locked.value.value(), AnyValue::Custom(_))
        {
            return None;
        }
        locked.value.try_cast::<T>().ok()
    }

    /// As [`Blackboard::get`], additionally returning the entry's write
    /// metadata.
    pub fn get_stamped<T>(&mut self, key: impl AsRef<str>) -> Result<(T, EntryStamp), BlackboardError>
    where
        T: Clone + Send + Sync + FromString + 'static,
    {
        let key = key.as_ref();
        let value = self.get::<T>(key)?;
        let entry = self
            .entry(key)
            .ok_or_else(|| BlackboardError::KeyNotFound(key.to_string()))?;
        let locked = entry.lock().unwrap();
        Ok((
            value,
            EntryStamp {
                sequence_id: locked.sequence_id,
                stamp: locked.stamp,
            },
        ))
    }

    /// Remove `key` from local storage. Parent entries are untouched.
    pub fn unset(&mut self, key: impl AsRef<str>) {
        self.data.write().unwrap().storage.remove(key.as_ref());
    }

    /// Current local keys; order unspecified.
    pub fn keys(&self) -> Vec<String> {
        self.data.read().unwrap().storage.keys().cloned().collect()
    }

    /// Scoped lock over the entry's `Any` for atomic read-modify-write.
    pub fn get_any_locked(&mut self, key: &str) -> Option<LockedAny> {
        self.entry(key).map(|entry| LockedAny { entry })
    }

    /// Copies all local entries' values into `dst`. Remapping rules and the
    /// parent link are not copied.
    pub fn clone_into(&self, dst: &mut Blackboard) {
        if Arc::ptr_eq(&self.data, &dst.data) {
            return;
        }

        let src = self.data.read().unwrap();
        let mut dst_data = dst.data.write().unwrap();

        for (key, entry) in src.storage.iter() {
            if let Some(existing) = dst_data.storage.get(key) {
                if Arc::ptr_eq(existing, entry) {
                    continue;
                }
                let value = entry.lock().unwrap().value.clone();
                existing.lock().unwrap().write(value);
            } else {
                let locked = entry.lock().unwrap();
                dst_data.storage.insert(
                    key.clone(),
                    Arc::new(Mutex::new(Entry {
                        value: locked.value.clone(),
                        info: locked.info.clone(),
                        sequence_id: locked.sequence_id,
                        stamp: locked.stamp,
                    })),
                );
            }
        }
    }

    /// Serialize the local entries whose value has a JSON representation.
    /// Custom values without one are skipped with a warning.
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut out = serde_json::Map::new();
        let data = self.data.read().unwrap();

        for (key, entry) in data.storage.iter() {
            let locked = entry.lock().unwrap();
            let value = match locked.value.value() {
                AnyValue::Int(v) => serde_json::Value::from(*v),
                AnyValue::Uint(v) => serde_json::Value::from(*v),
                AnyValue::Float(v) => serde_json::Value::from(*v),
                AnyValue::Bool(v) => serde_json::Value::from(*v),
                AnyValue::Str(v) => serde_json::Value::from(v.clone()),
                AnyValue::Empty => continue,
                AnyValue::Custom(_) => {
                    warn!(
                        "blackboard entry [{key}] of type [{}] has no JSON representation, skipping",
                        locked.info.type_name()
                    );
                    continue;
                }
            };
            out.insert(key.clone(), value);
        }

        out
    }

    /// Restore entries from a JSON object produced by [`Blackboard::to_json`].
    pub fn import_json(
        &mut self,
        values: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), BlackboardError> {
        for (key, value) in values.iter() {
            let any = match value {
                serde_json::Value::Bool(v) => Any::new(*v),
                serde_json::Value::Number(n) => {
                    if let Some(v) = n.as_i64() {
                        Any::new(v)
                    } else if let Some(v) = n.as_u64() {
                        Any::new(v)
                    } else {
                        Any::new(n.as_f64().unwrap_or_default())
                    }
                }
                serde_json::Value::String(v) => Any::new(v.clone()),
                _ => continue,
            };
            self.set_any(key, any)?;
        }
        Ok(())
    }

    /// Number of local entries.
    pub fn len(&self) -> usize {
        self.data.read().unwrap().storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn new_entry(info: &TypeInfo) -> EntryPtr {
    Arc::new(Mutex::new(Entry {
        value: Any::empty(),
        info: info.clone(),
        sequence_id: 0,
        stamp: monotonic_stamp(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_entry() {
        // With no remapping

        let mut root_bb = Blackboard::create();
        let mut left_bb = Blackboard::with_parent(&root_bb);
        let mut right_bb = Blackboard::with_parent(&root_bb);

        left_bb.set("foo", 123u32).unwrap();

        assert!(left_bb.get::<u32>("foo").is_ok());
        // These two should fail because remapping is not enabled
        assert!(right_bb.get::<u32>("foo").is_err());
        assert!(root_bb.get::<u32>("foo").is_err());

        // With autoremapping

        let mut root_bb = Blackboard::create();
        let mut left_bb = Blackboard::with_parent(&root_bb);
        let mut right_bb = Blackboard::with_parent(&root_bb);

        root_bb.enable_auto_remapping(true);
        left_bb.enable_auto_remapping(true);
        right_bb.enable_auto_remapping(true);

        left_bb.set("foo", 123u32).unwrap();

        assert_eq!(left_bb.get::<u32>("foo").unwrap(), 123);
        assert_eq!(right_bb.get::<u32>("foo").unwrap(), 123);
        assert_eq!(root_bb.get::<u32>("foo").unwrap(), 123);

        // With custom remapping
        let mut root_bb = Blackboard::create();
        let mut left_bb = Blackboard::with_parent(&root_bb);
        let mut right_bb = Blackboard::with_parent(&root_bb);

        right_bb.add_subtree_remapping(String::from("foo"), String::from("bar"));
        left_bb.add_subtree_remapping(String::from("foo"), String::from("bar"));

        left_bb.set("foo", 123u32).unwrap();

        assert_eq!(left_bb.get::<u32>("foo").unwrap(), 123);
        assert_eq!(right_bb.get::<u32>("foo").unwrap(), 123);
        assert_eq!(root_bb.get::<u32>("bar").unwrap(), 123);
    }

    #[test]
    fn root_redirect() {
        let root_bb = Blackboard::create();
        let child_bb = Blackboard::with_parent(&root_bb);
        let mut grandchild_bb = Blackboard::with_parent(&child_bb);

        grandchild_bb.set("@foo", 7i32).unwrap();

        assert!(grandchild_bb.get::<i32>("foo").is_err());
        assert_eq!(grandchild_bb.get::<i32>("@foo").unwrap(), 7);
        assert_eq!(grandchild_bb.root().get::<i32>("foo").unwrap(), 7);
    }

    #[test]
    fn sequence_id_increases() {
        let mut bb = Blackboard::create();

        bb.set("counter", 1i64).unwrap();
        let (_, first) = bb.get_stamped::<i64>("counter").unwrap();
        bb.set("counter", 2i64).unwrap();
        let (value, second) = bb.get_stamped::<i64>("counter").unwrap();

        assert_eq!(value, 2);
        assert!(second.sequence_id > first.sequence_id);
        assert!(second.stamp >= first.stamp);
    }

    #[test]
    fn typed_entries_reject_mismatched_writes() {
        let mut bb = Blackboard::create();

        bb.set("foo", 123u32).unwrap();
        // A lossless numeric write is fine
        bb.set("foo", 200i64).unwrap();
        assert_eq!(bb.get::<u32>("foo").unwrap(), 200);
        // A negative value can't fit the declared u32
        assert!(bb.set("foo", -1i64).is_err());
        // A different category is rejected outright
        assert!(bb.set("foo", String::from("hello")).is_err());
    }

    #[test]
    fn string_entries_parse_on_read() {
        let mut bb = Blackboard::create();

        bb.set("bar", String::from("100")).unwrap();

        assert_eq!(bb.get::<String>("bar").unwrap(), "100");
        assert_eq!(bb.get::<u32>("bar").unwrap(), 100u32);
        assert_eq!(bb.get_exact::<u32>("bar"), None);
    }

    #[test]
    fn unset_is_local_only() {
        let root_bb = Blackboard::create();
        let mut child_bb = Blackboard::with_parent(&root_bb);
        child_bb.enable_auto_remapping(true);

        child_bb.set("@foo", 1i32).unwrap();
        child_bb.unset("foo");

        assert_eq!(child_bb.root().get::<i32>("foo").unwrap(), 1);
    }

    #[test]
    fn clone_into_copies_values_only() {
        let mut src = Blackboard::create();
        src.add_subtree_remapping("a".to_string(), "b".to_string());
        src.set("x", 5i32).unwrap();
        src.set("y", String::from("hi")).unwrap();

        let mut dst = Blackboard::create();
        src.clone_into(&mut dst);

        assert_eq!(dst.get::<i32>("x").unwrap(), 5);
        assert_eq!(dst.get::<String>("y").unwrap(), "hi");
        // Remapping table is not copied: writing to "a" stays local in dst
        dst.set("a", 1i32).unwrap();
        assert!(dst.get::<i32>("b").is_err());
    }

    #[test]
    fn custom_type() {
        #[derive(Clone, Debug, PartialEq)]
        struct CustomEntry {
            pub foo: u32,
            pub bar: String,
        }

        impl FromString for CustomEntry {
            type Err = anyhow::Error;

            fn from_string(value: impl AsRef<str>) -> Result<Self, Self::Err> {
                let splits: Vec<&str> = value.as_ref().split(',').collect();

                if splits.len() != 2 {
                    Err(anyhow::anyhow!("Error!"))
                } else {
                    let foo = splits[0].parse()?;
                    Ok(CustomEntry {
                        foo,
                        bar: splits[1].to_string(),
                    })
                }
            }
        }

        let mut bb = Blackboard::create();

        let custom_value = CustomEntry {
            foo: 123,
            bar: String::from("bar"),
        };

        bb.set("custom", custom_value.clone()).unwrap();
        bb.set("custom_str", String::from("123,bar")).unwrap();
        bb.set("custom_str_malformed", String::from("not an int,bar"))
            .unwrap();

        assert_eq!(
            bb.get_exact::<CustomEntry>("custom").as_ref(),
            Some(&custom_value)
        );
        // Check parse from String
        assert_eq!(
            bb.get::<CustomEntry>("custom_str").ok().as_ref(),
            Some(&custom_value)
        );
        // Check it fails if it cannot be parsed
        assert!(bb.get::<CustomEntry>("custom_str_malformed").is_err());
    }
}
