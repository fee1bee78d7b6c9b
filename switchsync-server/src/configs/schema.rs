use crate::models::queued_intent::QueuedIntentTable;
use crate::models::switch_slot::SwitchSlotTable;
use crate::models::unit::UnitTable;
use crate::models::Table;

pub struct SchemaManager {
    tables: Vec<Box<dyn Table>>,
}

impl SchemaManager {
    /// Tables sorted so every table appears after the ones it references.
    pub fn new(tables: Vec<Box<dyn Table>>) -> Self {
        let mut remaining = tables;
        let mut sorted: Vec<Box<dyn Table>> = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let resolved: Vec<usize> = remaining
                .iter()
                .enumerate()
                .filter(|(_, table)| {
                    table
                        .dependencies()
                        .iter()
                        .all(|dep| sorted.iter().any(|done| done.name() == *dep))
                })
                .map(|(index, _)| index)
                .collect();

            assert!(
                !resolved.is_empty(),
                "Circular dependency detected or unresolved dependencies exist."
            );

            for index in resolved.into_iter().rev() {
                sorted.push(remaining.swap_remove(index));
            }
        }

        Self { tables: sorted }
    }

    pub fn create_schema(&self) -> Vec<String> {
        self.tables.iter().map(|table| table.create()).collect()
    }

    pub fn dispose_schema(&self) -> Vec<String> {
        self.tables.iter().rev().map(|table| table.dispose()).collect()
    }
}

impl Default for SchemaManager {
    fn default() -> Self {
        SchemaManager::new(vec![
            Box::new(UnitTable),
            Box::new(SwitchSlotTable),
            Box::new(QueuedIntentTable),
        ])
    }
}
