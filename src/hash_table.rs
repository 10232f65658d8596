use alloc::vec::Vec;
use core::fmt::Debug;
use core::iter::FusedIterator;

use tracing::debug;
use tracing::trace;

use crate::probe::Probe;

/// log2 of the capacity of a freshly created table.
const MIN_BITS: u32 = 2;

/// Returns `true` once `populated` entries exceed two thirds of `capacity`.
#[inline(always)]
fn exceeds_load_factor(populated: usize, capacity: usize) -> bool {
    populated.saturating_mul(3) > capacity.saturating_mul(2)
}

/// Smallest table size (as log2) that holds `populated` entries without
/// exceeding the load factor.
#[inline]
fn bits_for(populated: usize) -> u32 {
    let mut bits = MIN_BITS;
    while exceeds_load_factor(populated, 1usize << bits) {
        bits += 1;
    }
    bits
}

fn empty_slots<V>(capacity: usize) -> Vec<Slot<V>> {
    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, || Slot::Empty);
    slots
}

#[derive(Clone)]
enum Slot<V> {
    Empty,
    /// Left behind by a removal so that probe walks passing through the slot
    /// keep going.
    Tombstone,
    Occupied {
        hash: u64,
        value: V,
    },
}

/// Outcome of inspecting one slot during a probe walk.
enum Probed {
    Empty,
    Tombstone,
    Match,
    Collision,
}

/// Read-only view of a single slot, as yielded by [`HashTable::slots`].
#[derive(Debug, PartialEq, Eq)]
pub enum SlotView<'a, V> {
    /// The slot has never held a value since the last resize.
    Empty,
    /// The slot held a value that has since been removed.
    Tombstone,
    /// The slot holds a value.
    Occupied {
        /// The hash the value was inserted with.
        hash: u64,
        /// The stored value.
        value: &'a V,
    },
}

/// Debug statistics for hash table analysis.
///
/// Available in tests and with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Total number of slots allocated
    pub capacity: usize,
    /// Number of slots holding a tombstone
    pub tombstones: usize,
    /// Number of slots that are empty
    pub empty_slots: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Largest number of probe steps any stored entry sits away from its
    /// home slot
    pub longest_probe: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Slots: {} empty, {} tombstones",
            self.empty_slots, self.tombstones
        );
        println!("Longest probe: {}", self.longest_probe);
    }
}

/// An open-addressed hash table with perturbed probing.
///
/// `HashTable<V>` stores values of type `V` in a power-of-two array of slots.
/// Like other raw tables, it does not hash anything itself: every operation
/// takes the value's 64-bit hash and an equality predicate. A slot matches when
/// its stored hash equals the requested hash *and* the predicate accepts the
/// stored value.
///
/// Collisions are resolved by walking the [`Probe`] sequence for the hash.
/// Removal leaves a tombstone so later walks continue past the slot. The table
/// doubles in size as soon as more than two thirds of its slots hold values;
/// growth re-seats every live value and discards all tombstones. The table
/// never shrinks.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use perturb_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::new();
/// let hash = hash_id(123);
///
/// match table.entry(hash, |p: &Person| p.id == 123) {
///     perturb_hash::hash_table::Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     perturb_hash::hash_table::Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
/// ```
#[derive(Clone)]
pub struct HashTable<V> {
    slots: Vec<Slot<V>>,
    populated: usize,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::String;

        let slots = self
            .slots
            .iter()
            .map(|slot| match slot {
                Slot::Empty => String::from(".."),
                Slot::Tombstone => String::from("xx"),
                Slot::Occupied { hash, .. } => format!("{hash:016x}"),
            })
            .collect::<Vec<_>>();

        f.debug_struct("HashTable")
            .field("slots", &slots)
            .field("populated", &self.populated)
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table with the minimum capacity of four slots.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use perturb_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<u64> = HashTable::new();
    /// assert_eq!(table.capacity(), 4);
    /// assert!(table.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_bits(MIN_BITS)
    }

    /// Creates a new hash table that can hold at least `capacity` values
    /// without growing.
    ///
    /// The slot count is the smallest power of two (at least four) that keeps
    /// `capacity` values within the two-thirds load factor.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use perturb_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert_eq!(table.capacity(), 256);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_bits(bits_for(capacity))
    }

    fn with_bits(bits: u32) -> Self {
        Self {
            slots: empty_slots(1usize << bits),
            populated: 0,
        }
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    #[inline(always)]
    fn bits(&self) -> u32 {
        self.slots.len().trailing_zeros()
    }

    /// Returns the number of slots in the table.
    ///
    /// This is always a power of two, and at least four. The table grows once
    /// more than two thirds of the slots are populated.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of elements in the table.
    ///
    /// Tombstones left behind by removals are not counted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use perturb_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// assert_eq!(table.len(), 0);
    ///
    /// table.entry(hash_u64(1), |&n: &u64| n == 1).or_insert(1);
    /// assert_eq!(table.len(), 1);
    ///
    /// table.remove(hash_u64(1), |&n| n == 1);
    /// assert_eq!(table.len(), 0);
    /// ```
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Removes all elements from the table, keeping its capacity.
    ///
    /// Tombstones are cleared as well.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::Empty;
        }
        self.populated = 0;
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// Grows the table to the smallest power of two that keeps
    /// `self.len() + additional` values within the load factor. Does nothing if
    /// the table is already large enough.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use perturb_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<i32> = HashTable::new();
    /// table.reserve(50);
    /// assert!(table.capacity() * 2 >= 50 * 3);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        let bits = bits_for(self.populated.saturating_add(additional));
        if bits > self.bits() {
            self.rehash(bits, None);
        }
    }

    #[inline]
    fn probe_slot(&self, index: usize, hash: u64, eq: impl Fn(&V) -> bool) -> Probed {
        match &self.slots[index] {
            Slot::Empty => Probed::Empty,
            Slot::Tombstone => Probed::Tombstone,
            Slot::Occupied {
                hash: stored,
                value,
            } => {
                if *stored == hash && eq(value) {
                    Probed::Match
                } else {
                    Probed::Collision
                }
            }
        }
    }

    /// Walks the probe sequence for `hash` looking for a matching slot.
    ///
    /// Stops at the first empty slot: insertion never places a value past an
    /// empty slot on its walk, so nothing further along can match.
    #[inline]
    fn find_index(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<usize> {
        if self.populated == 0 {
            return None;
        }

        for index in Probe::new(hash, self.mask()) {
            match self.probe_slot(index, hash, &eq) {
                Probed::Empty => return None,
                Probed::Match => return Some(index),
                Probed::Tombstone | Probed::Collision => {}
            }
        }

        None
    }

    #[inline]
    fn value_mut(&mut self, index: usize) -> &mut V {
        match &mut self.slots[index] {
            Slot::Occupied { value, .. } => value,
            Slot::Empty | Slot::Tombstone => unreachable!("slot {index} is not occupied"),
        }
    }

    /// Replaces the occupied slot at `index` with a tombstone and returns its
    /// value.
    fn take(&mut self, index: usize) -> V {
        match core::mem::replace(&mut self.slots[index], Slot::Tombstone) {
            Slot::Occupied { hash, value } => {
                self.populated -= 1;
                trace!(index, hash, "entry removed");
                value
            }
            Slot::Empty | Slot::Tombstone => unreachable!("slot {index} is not occupied"),
        }
    }

    /// Finds a value in the table by hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use perturb_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(hash_u64(42), |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.find(hash_u64(42), |&n| n == 42), Some(&42));
    /// assert_eq!(table.find(hash_u64(99), |&n| n == 99), None);
    /// ```
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        let index = self.find_index(hash, eq)?;
        match &self.slots[index] {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Empty | Slot::Tombstone => None,
        }
    }

    /// Finds a value in the table by hash and equality predicate, returning a
    /// mutable reference.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use perturb_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(7, |&n: &u64| n == 42).or_insert(42);
    ///
    /// if let Some(value) = table.find_mut(7, |&n| n == 42) {
    ///     *value = 100;
    /// }
    ///
    /// assert_eq!(table.find(7, |&n| n == 100), Some(&100));
    /// ```
    #[inline]
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let index = self.find_index(hash, eq)?;
        Some(self.value_mut(index))
    }

    /// Removes and returns a value from the table.
    ///
    /// The slot is left as a tombstone. Removal never shrinks the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use perturb_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(3, |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.remove(3, |&n| n == 42), Some(42));
    /// assert!(table.is_empty());
    /// assert_eq!(table.remove(3, |&n| n == 42), None);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        let index = self.find_index(hash, eq)?;
        Some(self.take(index))
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// The returned entry is occupied if a slot on the probe walk matches.
    /// Otherwise it is vacant and points at the first tombstone seen on the
    /// walk, or at the empty slot that ended it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use perturb_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// let hash = hash_str("hello");
    ///
    /// match table.entry(hash, |s: &String| s == "hello") {
    ///     perturb_hash::hash_table::Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     perturb_hash::hash_table::Entry::Occupied(mut entry) => {
    ///         *entry.get_mut() = "updated".to_string();
    ///     }
    /// }
    ///
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V> {
        let mut tombstone = None;

        for index in Probe::new(hash, self.mask()) {
            match self.probe_slot(index, hash, &eq) {
                Probed::Match => {
                    return Entry::Occupied(OccupiedEntry { table: self, index });
                }
                Probed::Empty => {
                    return Entry::Vacant(VacantEntry {
                        table: self,
                        index: tombstone.unwrap_or(index),
                        hash,
                    });
                }
                Probed::Tombstone => {
                    tombstone.get_or_insert(index);
                }
                Probed::Collision => {
                    trace!(index, hash, "slot collision");
                }
            }
        }

        match tombstone {
            Some(index) => Entry::Vacant(VacantEntry {
                table: self,
                index,
                hash,
            }),
            // Every slot on the walk is occupied, which the load factor rules
            // out. Grow and walk again rather than fail.
            None => {
                self.rehash(self.bits() + 1, None);
                self.entry(hash, eq)
            }
        }
    }

    /// Rebuilds the table with `1 << bits` slots, re-seating every live value
    /// and dropping every tombstone.
    ///
    /// Returns the new index of the value that was at `tracked`, if any.
    #[cold]
    #[inline(never)]
    fn rehash(&mut self, bits: u32, tracked: Option<usize>) -> Option<usize> {
        let old_capacity = self.capacity();
        let old_slots = core::mem::replace(&mut self.slots, empty_slots(1usize << bits));

        let mut relocated = None;
        for (old_index, slot) in old_slots.into_iter().enumerate() {
            if let Slot::Occupied { hash, value } = slot {
                let index = self.reseat(hash, value);
                if tracked == Some(old_index) {
                    relocated = Some(index);
                }
            }
        }

        debug!(
            old_capacity,
            new_capacity = self.capacity(),
            populated = self.populated,
            "table resized"
        );

        relocated
    }

    /// Places a value known to be absent into the first empty slot of its
    /// walk.
    fn reseat(&mut self, hash: u64, value: V) -> usize {
        for index in Probe::new(hash, self.mask()) {
            if matches!(self.slots[index], Slot::Empty) {
                self.slots[index] = Slot::Occupied { hash, value };
                return index;
            }
        }

        unreachable!("resized table has no empty slot on the probe walk")
    }

    /// Returns an iterator over all values in the table, in slot order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use perturb_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(1, |s: &String| s == "a").or_insert("a".to_string());
    /// table.entry(2, |s: &String| s == "b").or_insert("b".to_string());
    ///
    /// let mut values: Vec<&String> = table.iter().collect();
    /// values.sort();
    /// assert_eq!(values, ["a", "b"]);
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            inner: self.slots.iter(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator that removes and yields all values from the table.
    ///
    /// After the iterator is dropped the table is empty, free of tombstones,
    /// and keeps its capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use perturb_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(1, |s: &String| s == "a").or_insert("a".to_string());
    ///
    /// let values: Vec<String> = table.drain().collect();
    /// assert!(table.is_empty());
    /// assert_eq!(values, ["a"]);
    /// ```
    pub fn drain(&mut self) -> Drain<'_, V> {
        Drain {
            table: self,
            slot_index: 0,
        }
    }

    /// Returns an iterator over every slot of the table, in slot order.
    ///
    /// Intended for inspection and diagnostics.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use perturb_hash::hash_table::HashTable;
    /// # use perturb_hash::hash_table::SlotView;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(2, |&n: &u32| n == 9).or_insert(9);
    ///
    /// let slots: Vec<_> = table.slots().collect();
    /// assert_eq!(slots.len(), 4);
    /// assert_eq!(slots[2], SlotView::Occupied { hash: 2, value: &9 });
    /// assert_eq!(slots[0], SlotView::Empty);
    /// ```
    pub fn slots(&self) -> Slots<'_, V> {
        Slots {
            inner: self.slots.iter(),
        }
    }

    /// Computes a histogram of probe distances for the current table state.
    ///
    /// Entry `i` of the result counts the values sitting `i` steps along their
    /// probe walk; entry 0 counts values in their home slot.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> Vec<usize> {
        let mut hist = Vec::new();

        for (index, slot) in self.slots.iter().enumerate() {
            if let Slot::Occupied { hash, .. } = slot {
                let distance = Probe::new(*hash, self.mask())
                    .position(|probed| probed == index)
                    .unwrap_or(0);
                if hist.len() <= distance {
                    hist.resize(distance + 1, 0);
                }
                hist[distance] += 1;
            }
        }

        hist
    }

    /// Returns slot utilization and probe-length statistics.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let mut tombstones = 0;
        let mut empty_slots = 0;
        for slot in &self.slots {
            match slot {
                Slot::Empty => empty_slots += 1,
                Slot::Tombstone => tombstones += 1,
                Slot::Occupied { .. } => {}
            }
        }

        DebugStats {
            populated: self.populated,
            capacity: self.capacity(),
            tombstones,
            empty_slots,
            load_factor: self.populated as f64 / self.capacity() as f64,
            longest_probe: self.probe_histogram().len().saturating_sub(1),
        }
    }

    /// Pretty-prints the probe-distance histogram horizontally using stdout.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_probe_histogram(&self) {
        let hist = self.probe_histogram();
        let max = hist.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        println!("probe histogram ({} entries):", self.populated);
        for (distance, &count) in hist.iter().enumerate() {
            let width = (count * max_bar).div_ceil(max);
            println!("{:>3} | {} ({})", distance, "█".repeat(width), count);
        }
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
///
/// # Examples
///
/// ```rust
/// # use perturb_hash::hash_table::Entry;
/// # use perturb_hash::hash_table::HashTable;
/// #
/// let mut table = HashTable::new();
///
/// match table.entry(11, |s: &String| s == "key") {
///     Entry::Vacant(entry) => {
///         entry.insert("key".to_string());
///     }
///     Entry::Occupied(entry) => {
///         println!("Key already exists with value: {}", entry.get());
///     }
/// }
/// ```
pub enum Entry<'a, V> {
    /// A vacant entry - no matching value is present in the table
    Vacant(VacantEntry<'a, V>),
    /// An occupied entry - a matching value is present in the table
    Occupied(OccupiedEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use perturb_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    ///
    /// let value = table.entry(5, |s: &String| s == "key").or_insert("key".to_string());
    /// assert_eq!(value, "key");
    ///
    /// let existing = table.entry(5, |s: &String| s == "key").or_insert("other".to_string());
    /// assert_eq!(existing, "key");
    /// ```
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value in the entry.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Inserts the default value if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(V::default)
    }
}

/// A view into a vacant entry in the hash table.
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
    hash: u64,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Inserts a value into the vacant entry and returns a mutable reference to
    /// it.
    ///
    /// If the insertion pushes the table past its load factor, the table
    /// doubles before this returns and the reference points at the value's new
    /// slot.
    pub fn insert(self, value: V) -> &'a mut V {
        let VacantEntry { table, index, hash } = self;

        table.slots[index] = Slot::Occupied { hash, value };
        table.populated += 1;
        trace!(index, hash, "entry inserted");

        let mut index = index;
        if exceeds_load_factor(table.populated, table.capacity()) {
            index = table.rehash(table.bits() + 1, Some(index)).unwrap_or(index);
        }

        table.value_mut(index)
    }
}

/// A view into an occupied entry in the hash table.
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        match &self.table.slots[self.index] {
            Slot::Occupied { value, .. } => value,
            Slot::Empty | Slot::Tombstone => unreachable!("slot {} is not occupied", self.index),
        }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        self.table.value_mut(self.index)
    }

    /// Converts the entry into a mutable reference to the value, bound to the
    /// lifetime of the table.
    pub fn into_mut(self) -> &'a mut V {
        self.table.value_mut(self.index)
    }

    /// Replaces the value in the entry, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the value from the table, leaving a tombstone.
    pub fn remove(self) -> V {
        self.table.take(self.index)
    }
}

/// An iterator over the values in a [`HashTable`], in slot order.
///
/// This struct is created by the [`iter`] method on [`HashTable`].
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, V> {
    inner: core::slice::Iter<'a, Slot<V>>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.inner.by_ref() {
            if let Slot::Occupied { value, .. } = slot {
                self.remaining -= 1;
                return Some(value);
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> FusedIterator for Iter<'_, V> {}

/// An iterator over every slot of a [`HashTable`].
///
/// This struct is created by the [`slots`] method on [`HashTable`].
///
/// [`slots`]: HashTable::slots
pub struct Slots<'a, V> {
    inner: core::slice::Iter<'a, Slot<V>>,
}

impl<'a, V> Iterator for Slots<'a, V> {
    type Item = SlotView<'a, V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|slot| match slot {
            Slot::Empty => SlotView::Empty,
            Slot::Tombstone => SlotView::Tombstone,
            Slot::Occupied { hash, value } => SlotView::Occupied { hash: *hash, value },
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for Slots<'_, V> {}

/// A draining iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`].
/// It yields owned `V` values and empties the table as it iterates.
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, V> {
    table: &'a mut HashTable<V>,
    slot_index: usize,
}

impl<V> Drop for Drain<'_, V> {
    fn drop(&mut self) {
        for _ in &mut *self {}
    }
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        while self.slot_index < self.table.slots.len() {
            let slot = core::mem::replace(&mut self.table.slots[self.slot_index], Slot::Empty);
            self.slot_index += 1;

            if let Slot::Occupied { value, .. } = slot {
                self.table.populated -= 1;
                return Some(value);
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Item {
        key: u64,
        value: i32,
    }

    fn hash_key(state: &HashState, key: u64) -> u64 {
        let mut h = state.build_hasher();
        h.write_u64(key);
        h.finish()
    }

    fn insert_item(table: &mut HashTable<Item>, hash: u64, key: u64, value: i32) {
        match table.entry(hash, |v| v.key == key) {
            Entry::Vacant(v) => {
                v.insert(Item { key, value });
            }
            Entry::Occupied(_) => panic!("unexpected occupied for {key}: {table:#?}"),
        }
    }

    fn assert_load_invariants<V>(table: &HashTable<V>) {
        assert!(table.capacity().is_power_of_two());
        assert!(table.capacity() >= 4);
        assert!(table.len() * 3 <= table.capacity() * 2, "{table:#?}");

        let occupied = table
            .slots()
            .filter(|slot| matches!(slot, SlotView::Occupied { .. }))
            .count();
        assert_eq!(occupied, table.len());
    }

    #[test]
    fn starts_with_four_slots() {
        let table: HashTable<Item> = HashTable::new();
        assert_eq!(table.capacity(), 4);
        assert!(table.is_empty());
        assert_eq!(table.find(0, |_| true), None);
    }

    #[test]
    fn with_capacity_respects_load_factor() {
        assert_eq!(HashTable::<u8>::with_capacity(0).capacity(), 4);
        assert_eq!(HashTable::<u8>::with_capacity(2).capacity(), 4);
        assert_eq!(HashTable::<u8>::with_capacity(3).capacity(), 8);
        assert_eq!(HashTable::<u8>::with_capacity(5).capacity(), 8);
        assert_eq!(HashTable::<u8>::with_capacity(6).capacity(), 16);
        assert_eq!(HashTable::<u8>::with_capacity(100).capacity(), 256);
    }

    #[test]
    fn insert_and_find() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            insert_item(&mut table, hash, k, (k as i32) * 2);
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: (k as i32) * 2
                }),
                "{:#?}",
                table
            );
            assert_load_invariants(&table);
        }
        assert_eq!(table.len(), 32);
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: (k as i32) * 2
                }),
                "{:#?}",
                table
            );
        }

        let miss_hash = hash_key(&state, 999);
        assert!(table.find(miss_hash, |v| v.key == 999).is_none());
    }

    #[test]
    fn growth_doubles_capacity() {
        let mut table: HashTable<Item> = HashTable::new();
        insert_item(&mut table, 0, 0, 0);
        insert_item(&mut table, 1, 1, 1);
        assert_eq!(table.capacity(), 4);

        // 3 > 2/3 * 4
        insert_item(&mut table, 2, 2, 2);
        assert_eq!(table.capacity(), 8);

        insert_item(&mut table, 3, 3, 3);
        insert_item(&mut table, 4, 4, 4);
        assert_eq!(table.capacity(), 8);

        // 6 > 2/3 * 8
        insert_item(&mut table, 5, 5, 5);
        assert_eq!(table.capacity(), 16);
        assert_load_invariants(&table);
    }

    #[test]
    fn insert_reference_survives_growth() {
        let mut table: HashTable<Item> = HashTable::new();
        insert_item(&mut table, 0, 0, 0);
        insert_item(&mut table, 1, 1, 1);

        let value = match table.entry(2, |v| v.key == 2) {
            Entry::Vacant(v) => v.insert(Item { key: 2, value: 2 }),
            Entry::Occupied(_) => unreachable!(),
        };
        value.value = 20;

        assert_eq!(table.capacity(), 8);
        assert_eq!(table.find(2, |v| v.key == 2).map(|v| v.value), Some(20));
    }

    #[test]
    fn duplicate_entry_is_occupied() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        let k = 42u64;
        let hash = hash_key(&state, k);

        insert_item(&mut table, hash, k, 7);

        match table.entry(hash, |v| v.key == k) {
            Entry::Occupied(mut occ) => {
                let prev = occ.insert(Item { key: k, value: 11 });
                assert_eq!(prev.value, 7);
            }
            Entry::Vacant(_) => panic!("should be occupied: {}#{:02X} in {:#?}", k, hash, table),
        }
        let found = table.find(hash, |v| v.key == k).unwrap();
        assert_eq!(found.value, 11);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn find_mut_and_modify() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..5u64 {
            insert_item(&mut table, hash_key(&state, k), k, 1);
        }

        for k in 0..5u64 {
            let hash = hash_key(&state, k);
            if let Some(v) = table.find_mut(hash, |v| v.key == k) {
                v.value += 9;
            }
        }
        for k in 0..5u64 {
            let hash = hash_key(&state, k);
            let v = table.find(hash, |v| v.key == k).unwrap();
            assert_eq!(v.value, 10);
        }
    }

    #[test]
    fn remove_items() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..8u64 {
            insert_item(&mut table, hash_key(&state, k), k, k as i32);
        }
        assert_eq!(table.len(), 8);
        let capacity = table.capacity();

        for k in [0u64, 3, 7] {
            let hash = hash_key(&state, k);
            let removed = table.remove(hash, |v| v.key == k).expect("should remove");
            assert_eq!(removed.key, k);
            assert!(table.find(hash, |v| v.key == k).is_none());
        }
        assert_eq!(table.len(), 5);
        assert_eq!(table.capacity(), capacity);
        assert_eq!(table.debug_stats().tombstones, 3);

        for k in [1u64, 2, 4, 5, 6] {
            let hash = hash_key(&state, k);
            assert_eq!(table.find(hash, |v| v.key == k).map(|v| v.key), Some(k));
        }

        let hash = hash_key(&state, 1000);
        assert!(table.remove(hash, |v| v.key == 1000).is_none());
    }

    #[test]
    fn remove_from_empty_table() {
        let mut table: HashTable<Item> = HashTable::new();
        assert!(table.remove(0, |_| true).is_none());
        assert!(table.find_mut(0, |_| true).is_none());
    }

    #[test]
    fn lookup_continues_past_tombstone() {
        let mut table: HashTable<Item> = HashTable::with_capacity(4);
        assert_eq!(table.capacity(), 8);

        // Hashes 0 and 8 share home slot 0; 8 moves on to slot 1.
        insert_item(&mut table, 0, 0, 0);
        insert_item(&mut table, 8, 8, 8);
        let slots: Vec<_> = table.slots().collect();
        assert!(matches!(slots[0], SlotView::Occupied { hash: 0, .. }));
        assert!(matches!(slots[1], SlotView::Occupied { hash: 8, .. }));

        table.remove(0, |v| v.key == 0).unwrap();
        assert!(matches!(table.slots().next(), Some(SlotView::Tombstone)));
        assert_eq!(table.find(8, |v| v.key == 8).map(|v| v.value), Some(8));
    }

    #[test]
    fn insert_reuses_first_tombstone() {
        let mut table: HashTable<Item> = HashTable::with_capacity(4);
        insert_item(&mut table, 0, 0, 0);
        insert_item(&mut table, 8, 8, 8);
        table.remove(0, |v| v.key == 0).unwrap();

        // Walk for 16 is 0 (tombstone), 1 (collision), 6 (empty).
        insert_item(&mut table, 16, 16, 16);
        let slots: Vec<_> = table.slots().collect();
        assert_eq!(
            slots[0],
            SlotView::Occupied {
                hash: 16,
                value: &Item { key: 16, value: 16 }
            }
        );
        assert_eq!(slots[6], SlotView::Empty);
        assert_eq!(table.debug_stats().tombstones, 0);
    }

    #[test]
    fn reinsert_past_tombstone_stays_unique() {
        let mut table: HashTable<Item> = HashTable::with_capacity(4);
        insert_item(&mut table, 0, 0, 0);
        insert_item(&mut table, 8, 8, 8);
        table.remove(0, |v| v.key == 0).unwrap();

        match table.entry(8, |v| v.key == 8) {
            Entry::Occupied(mut occ) => {
                occ.get_mut().value = 80;
            }
            Entry::Vacant(_) => panic!("key 8 sits past the tombstone: {table:#?}"),
        }

        assert_eq!(table.len(), 1);
        assert_eq!(table.iter().map(|v| v.value).collect::<Vec<_>>(), [80]);
    }

    #[test]
    fn lookup_terminates_without_empty_slots() {
        let mut table: HashTable<Item> = HashTable::new();
        for hash in 0..4u64 {
            insert_item(&mut table, hash, hash, 0);
            table.remove(hash, |v| v.key == hash).unwrap();
        }
        assert_eq!(table.capacity(), 4);
        assert_eq!(table.debug_stats().tombstones, 4);

        insert_item(&mut table, 0, 100, 1);
        assert_eq!(table.len(), 1);
        assert_eq!(table.debug_stats().empty_slots, 0);

        assert!(table.find(1, |v| v.key == 101).is_none());
        assert!(table.remove(3, |v| v.key == 103).is_none());
        assert_eq!(table.find(0, |v| v.key == 100).map(|v| v.value), Some(1));
    }

    #[test]
    fn growth_discards_tombstones() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(5);
        assert_eq!(table.capacity(), 8);

        for k in 0..5u64 {
            insert_item(&mut table, hash_key(&state, k), k, 0);
        }
        for k in 0..3u64 {
            table.remove(hash_key(&state, k), |v| v.key == k).unwrap();
        }
        assert_eq!(table.debug_stats().tombstones, 3);

        for k in 10..14u64 {
            insert_item(&mut table, hash_key(&state, k), k, 0);
        }
        // 6 live entries pushes 8 slots past the load factor.
        assert_eq!(table.len(), 6);
        assert_eq!(table.capacity(), 16);
        assert_eq!(table.debug_stats().tombstones, 0);
        assert_load_invariants(&table);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn insert_many() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..100000u64 {
            let hash = hash_key(&state, k);
            insert_item(&mut table, hash, k, k as i32);
        }

        assert_eq!(table.len(), 100000);
        assert_load_invariants(&table);
        for k in 0..100000u64 {
            let hash = hash_key(&state, k);
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: k as i32
                })
            );
        }
    }

    #[test]
    fn explicit_collision() {
        let mut table: HashTable<Item> = HashTable::new();
        let hash = 0;
        for k in 0..65u64 {
            insert_item(&mut table, hash, k, k as i32);
        }

        assert_eq!(table.len(), 65);
        for k in 0..65u64 {
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: k as i32
                }),
                "{:#?}",
                table
            );
        }
    }

    #[test]
    fn zero_hash_is_occupied() {
        let mut table: HashTable<Item> = HashTable::new();
        insert_item(&mut table, 0, 1, 10);

        assert_eq!(table.find(0, |v| v.key == 1).map(|v| v.value), Some(10));
        match table.entry(0, |v| v.key == 1) {
            Entry::Occupied(occ) => assert_eq!(occ.get().value, 10),
            Entry::Vacant(_) => panic!("zero hash must not read as empty"),
        }
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn hash_only_predicate_merges_equal_hashes() {
        let mut table: HashTable<Item> = HashTable::new();
        table
            .entry(77, |_| true)
            .or_insert(Item { key: 1, value: 1 });

        match table.entry(77, |_| true) {
            Entry::Occupied(mut occ) => {
                occ.insert(Item { key: 2, value: 2 });
            }
            Entry::Vacant(_) => panic!("equal hashes match under a hash-only predicate"),
        }

        assert_eq!(table.len(), 1);
        assert_eq!(table.find(77, |_| true).map(|v| v.key), Some(2));
    }

    #[test]
    fn occupied_entry_remove() {
        let mut table: HashTable<Item> = HashTable::new();
        insert_item(&mut table, 5, 5, 50);

        match table.entry(5, |v| v.key == 5) {
            Entry::Occupied(occ) => assert_eq!(occ.remove().value, 50),
            Entry::Vacant(_) => unreachable!(),
        }
        assert!(table.is_empty());
        assert!(table.find(5, |v| v.key == 5).is_none());
    }

    #[test]
    fn iter_and_drain() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 10..20u64 {
            insert_item(&mut table, hash_key(&state, k), k, (k as i32) + 1);
        }
        table.remove(hash_key(&state, 10), |v| v.key == 10).unwrap();

        let iter = table.iter();
        assert_eq!(iter.len(), 9);
        let collected: Vec<u64> = iter.map(|v| v.key).collect();
        assert_eq!(collected.len(), 9, "{:#?}", table);
        for k in 11..20u64 {
            assert!(collected.contains(&k));
        }

        let capacity = table.capacity();
        let drained: Vec<Item> = table.drain().collect();
        assert_eq!(drained.len(), 9);
        assert_eq!(table.len(), 0);
        assert_eq!(table.capacity(), capacity);
        assert_eq!(table.debug_stats().empty_slots, capacity);

        for k in 10..20u64 {
            let hash = hash_key(&state, k);
            assert!(table.find(hash, |v| v.key == k).is_none());
        }
    }

    #[test]
    fn dropped_drain_empties_table() {
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..10u64 {
            insert_item(&mut table, k, k, 0);
        }

        let mut drain = table.drain();
        assert!(drain.next().is_some());
        drop(drain);

        assert!(table.is_empty());
        assert!(table.slots().all(|slot| slot == SlotView::Empty));
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct StringItem {
        key: String,
        value: i32,
    }

    fn hash_string_key(state: &HashState, key: &str) -> u64 {
        let mut h = state.build_hasher();
        h.write(key.as_bytes());
        h.finish()
    }

    #[test]
    fn string_keys() {
        let state = HashState::default();
        let mut table: HashTable<StringItem> = HashTable::new();
        let keys = ["hello", "world", "foo", "bar", "baz"];

        for (i, k) in keys.iter().enumerate() {
            let hash = hash_string_key(&state, k);
            table
                .entry(hash, |v: &StringItem| v.key == *k)
                .or_insert(StringItem {
                    key: k.to_string(),
                    value: i as i32,
                });
        }
        assert_eq!(table.len(), keys.len());

        let hash_foo = hash_string_key(&state, "foo");
        let removed = table.remove(hash_foo, |v| v.key == "foo").unwrap();
        assert_eq!(removed.value, 2);

        let mut found_keys = table
            .iter()
            .map(|item| item.key.clone())
            .collect::<Vec<_>>();
        found_keys.sort();
        assert_eq!(found_keys, vec!["bar", "baz", "hello", "world"]);
    }

    #[test]
    fn entry_combinators() {
        let mut table: HashTable<StringItem> = HashTable::new();
        let key = "unique_key";

        let value_ref = table
            .entry(9, |v| v.key == key)
            .or_insert_with(|| StringItem {
                key: key.to_string(),
                value: 42,
            });
        assert_eq!(value_ref.value, 42);

        let existing = table
            .entry(9, |v| v.key == key)
            .and_modify(|v| v.value += 1)
            .or_insert_with(|| unreachable!());
        assert_eq!(existing.value, 43);
        assert_eq!(table.len(), 1);

        let mut counts: HashTable<u32> = HashTable::new();
        *counts.entry(1, |_| true).or_default() += 5;
        *counts.entry(1, |_| true).or_default() += 5;
        assert_eq!(counts.find(1, |_| true), Some(&10));
    }

    #[test]
    fn clear_and_reserve() {
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..20u64 {
            insert_item(&mut table, k, k, 0);
        }
        table.remove(3, |v| v.key == 3).unwrap();
        let capacity = table.capacity();

        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.capacity(), capacity);
        assert_eq!(table.debug_stats().tombstones, 0);

        table.reserve(1000);
        assert_eq!(table.capacity(), 2048);
        table.reserve(10);
        assert_eq!(table.capacity(), 2048);

        for k in 0..1000u64 {
            insert_item(&mut table, k, k, 0);
        }
        assert_eq!(table.capacity(), 2048);
    }

    #[test]
    fn clone_is_independent() {
        let mut original: HashTable<Item> = HashTable::new();
        for k in 0..10u64 {
            insert_item(&mut original, k, k, k as i32);
        }
        original.remove(4, |v| v.key == 4).unwrap();

        let mut cloned = original.clone();
        assert_eq!(cloned.len(), original.len());
        assert_eq!(cloned.capacity(), original.capacity());
        assert!(cloned.slots().eq(original.slots()));

        cloned.find_mut(1, |v| v.key == 1).unwrap().value = 100;
        assert_eq!(original.find(1, |v| v.key == 1).unwrap().value, 1);
    }

    #[test]
    fn stats_and_histogram() {
        let mut table: HashTable<Item> = HashTable::with_capacity(4);
        insert_item(&mut table, 0, 0, 0);
        insert_item(&mut table, 8, 8, 0);
        insert_item(&mut table, 16, 16, 0);

        // 0 sits at home, 8 one step away, 16 two steps away.
        assert_eq!(table.probe_histogram(), vec![1, 1, 1]);

        let stats = table.debug_stats();
        assert_eq!(stats.populated, 3);
        assert_eq!(stats.capacity, 8);
        assert_eq!(stats.empty_slots, 5);
        assert_eq!(stats.tombstones, 0);
        assert_eq!(stats.longest_probe, 2);
        assert!((stats.load_factor - 0.375).abs() < f64::EPSILON);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    #[cfg(feature = "std")]
    fn histogram_output() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(10000);
        for k in 0..10000u64 {
            insert_item(&mut table, hash_key(&state, k), k, k as i32);
        }

        table.print_probe_histogram();
        table.debug_stats().print();
    }
}
