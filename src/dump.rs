//! Slot-by-slot rendering of a [`HashMap`](crate::HashMap).
//!
//! The rendering is a fixed-width table framed by dashed rules:
//!
//! ```text
//! ------------------------------------------------------------------------------------------
//! |index|hash                                                            |key     |value   |
//! ------------------------------------------------------------------------------------------
//! |00000|                                                                |        |        |
//! |00001|0000000000000000000000000000000000000000000000000000000000000001|       1|      10|
//! ...
//! ------------------------------------------------------------------------------------------
//! ```
//!
//! Indices are printed in binary with at least five digits, hashes as 64-bit
//! binary, and keys and values right-aligned in eight columns. Empty slots
//! are blank. Removed slots show `<deleted>` in the hash column.

use core::fmt;
use core::fmt::Display;

use crate::hash_table::HashTable;
use crate::hash_table::SlotView;

const MIN_INDEX_WIDTH: usize = 5;
const HASH_WIDTH: usize = u64::BITS as usize;
const CELL_WIDTH: usize = 8;

/// Displayable dump of every slot of a map, returned by
/// [`HashMap::dump`](crate::HashMap::dump).
pub struct Dump<'a, K, V> {
    table: &'a HashTable<(K, V)>,
}

impl<'a, K, V> Dump<'a, K, V> {
    pub(crate) fn new(table: &'a HashTable<(K, V)>) -> Self {
        Self { table }
    }

    fn index_width(&self) -> usize {
        (self.table.capacity().trailing_zeros() as usize).max(MIN_INDEX_WIDTH)
    }
}

impl<K, V> Display for Dump<'_, K, V>
where
    K: Display,
    V: Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index_width = self.index_width();
        // Five separators around four columns.
        let rule_width = index_width + HASH_WIDTH + 2 * CELL_WIDTH + 5;

        writeln!(f, "{:-<rule_width$}", "")?;
        writeln!(
            f,
            "|{:<index_width$}|{:<HASH_WIDTH$}|{:<CELL_WIDTH$}|{:<CELL_WIDTH$}|",
            "index", "hash", "key", "value"
        )?;
        writeln!(f, "{:-<rule_width$}", "")?;

        for (index, slot) in self.table.slots().enumerate() {
            write!(f, "|{index:0index_width$b}|")?;
            match slot {
                SlotView::Empty => writeln!(
                    f,
                    "{:HASH_WIDTH$}|{:CELL_WIDTH$}|{:CELL_WIDTH$}|",
                    "", "", ""
                )?,
                SlotView::Tombstone => writeln!(
                    f,
                    "{:<HASH_WIDTH$}|{:CELL_WIDTH$}|{:CELL_WIDTH$}|",
                    "<deleted>", "", ""
                )?,
                SlotView::Occupied {
                    hash,
                    value: (key, value),
                } => writeln!(
                    f,
                    "{hash:0HASH_WIDTH$b}|{key:>CELL_WIDTH$}|{value:>CELL_WIDTH$}|"
                )?,
            }
        }

        write!(f, "{:-<rule_width$}", "")
    }
}
