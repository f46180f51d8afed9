#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use chrono::NaiveDate;
use engine::{
    CategoryMapping, Engine, FlagColor, Ledger, LedgerError, Milliunits, ResultEngine, RuleStore,
    ShareFraction, Transaction, TransactionDraft, TransactionPatch, User, UserId, WriteReceipt,
    closest_name,
};
use serde_json::json;

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

pub fn share(raw: &str) -> ShareFraction {
    raw.parse().unwrap()
}

pub fn user(id: u32, name: &str, share_raw: &str) -> User {
    User::new(UserId(id), name, share(share_raw))
        .budget_id(format!("budget-{}", name.to_lowercase()))
        .shared_account(format!("Shared {name}"))
}

pub fn alice() -> User {
    user(1, "Alice", "0.5")
}

pub fn bob() -> User {
    user(2, "Bob", "0.5")
}

pub fn rent_row() -> CategoryMapping {
    CategoryMapping::new(true)
        .alias("Housing")
        .category(UserId(1), "Rent")
        .category(UserId(2), "Rent-Split")
        .category(UserId(3), "Rent")
}

pub fn tx(id: &str, budget_id: &str, amount: i64, category: &str) -> Transaction {
    Transaction::new(id, budget_id, date(10), Milliunits::new(amount))
        .payee("Landlord")
        .account("Checking")
        .category(category)
}

pub struct MemoryRules {
    pub users: Vec<User>,
    pub mappings: Vec<CategoryMapping>,
}

impl RuleStore for MemoryRules {
    async fn get_users(&self) -> ResultEngine<Vec<User>> {
        Ok(self.users.clone())
    }

    async fn get_category_mappings(&self) -> ResultEngine<Vec<CategoryMapping>> {
        Ok(self.mappings.clone())
    }
}

/// Ledger kept in memory. Budgets are keyed by id; names are used by
/// `find_budget_id`.
#[derive(Default)]
pub struct MemoryLedger {
    pub budgets: Mutex<HashMap<String, Vec<Transaction>>>,
    pub names: Vec<(String, String)>,
    pub failing_budgets: HashSet<String>,
    pub writes: Mutex<usize>,
    next_id: Mutex<usize>,
}

impl MemoryLedger {
    pub fn with_budget(self, budget_id: &str, transactions: Vec<Transaction>) -> Self {
        self.budgets
            .lock()
            .unwrap()
            .insert(budget_id.to_string(), transactions);
        self
    }

    pub fn named(mut self, budget_id: &str, name: &str) -> Self {
        self.names.push((budget_id.to_string(), name.to_string()));
        self
    }

    pub fn failing(mut self, budget_id: &str) -> Self {
        self.failing_budgets.insert(budget_id.to_string());
        self
    }

    pub fn transactions(&self, budget_id: &str) -> Vec<Transaction> {
        self.budgets
            .lock()
            .unwrap()
            .get(budget_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn find(&self, budget_id: &str, id: &str) -> Transaction {
        self.transactions(budget_id)
            .into_iter()
            .find(|tx| tx.id == id)
            .unwrap()
    }

    pub fn edit(&self, budget_id: &str, id: &str, change: impl FnOnce(&mut Transaction)) {
        let mut budgets = self.budgets.lock().unwrap();
        let tx = budgets
            .get_mut(budget_id)
            .and_then(|txs| txs.iter_mut().find(|tx| tx.id == id))
            .unwrap();
        change(tx);
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    fn check_writable(&self, budget_id: &str) -> Result<(), LedgerError> {
        if self.failing_budgets.contains(budget_id) {
            return Err(LedgerError::Rejected(format!("budget {budget_id} is read-only")));
        }
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}

impl Ledger for MemoryLedger {
    async fn get_transactions(
        &self,
        budget_id: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let budgets = self.budgets.lock().unwrap();
        let txs = budgets
            .get(budget_id)
            .ok_or_else(|| LedgerError::NotFound(format!("budget {budget_id}")))?;
        Ok(txs
            .iter()
            .filter(|tx| since.is_none_or(|since| tx.date >= since))
            .cloned()
            .collect())
    }

    async fn get_transaction(
        &self,
        budget_id: &str,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, LedgerError> {
        Ok(self
            .transactions(budget_id)
            .into_iter()
            .find(|tx| tx.id == transaction_id))
    }

    async fn create_transaction(
        &self,
        budget_id: &str,
        draft: &TransactionDraft,
    ) -> Result<WriteReceipt, LedgerError> {
        self.check_writable(budget_id)?;
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("{budget_id}-mirror-{next}")
        };
        let mut budgets = self.budgets.lock().unwrap();
        let txs = budgets
            .get_mut(budget_id)
            .ok_or_else(|| LedgerError::NotFound(format!("budget {budget_id}")))?;
        if txs
            .iter()
            .any(|tx| tx.import_id.as_deref() == Some(draft.import_id.as_str()))
        {
            return Err(LedgerError::Rejected("duplicate import id".to_string()));
        }
        let mut tx = Transaction::new(&id, budget_id, draft.date, draft.amount)
            .payee(&draft.payee)
            .account(&draft.account_name)
            .import_id(&draft.import_id);
        tx.category = draft.category.clone();
        tx.memo = draft.memo.clone();
        tx.subtransactions = draft.subtransactions.clone();
        txs.push(tx);
        Ok(WriteReceipt {
            transaction_id: id.clone(),
            raw: json!({ "transaction": { "id": id } }),
        })
    }

    async fn update_transaction(
        &self,
        budget_id: &str,
        transaction_id: &str,
        patch: &TransactionPatch,
    ) -> Result<WriteReceipt, LedgerError> {
        self.check_writable(budget_id)?;
        let mut budgets = self.budgets.lock().unwrap();
        let tx = budgets
            .get_mut(budget_id)
            .and_then(|txs| txs.iter_mut().find(|tx| tx.id == transaction_id))
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {transaction_id}")))?;
        if let Some(amount) = patch.amount {
            tx.amount = amount;
        }
        if let Some(category) = &patch.category {
            tx.category = Some(category.clone());
        }
        if let Some(flag) = patch.flag {
            tx.flag = Some(flag);
        }
        Ok(WriteReceipt {
            transaction_id: transaction_id.to_string(),
            raw: json!({ "transaction": { "id": transaction_id } }),
        })
    }

    async fn find_by_marker(
        &self,
        budget_id: &str,
        marker: &str,
    ) -> Result<Option<Transaction>, LedgerError> {
        Ok(self
            .transactions(budget_id)
            .into_iter()
            .find(|tx| tx.import_id.as_deref() == Some(marker)))
    }

    async fn find_budget_id(&self, name: &str) -> Result<String, LedgerError> {
        let names: Vec<&str> = self.names.iter().map(|(_, name)| name.as_str()).collect();
        closest_name(name, &names)
            .map(|index| self.names[index].0.clone())
            .ok_or_else(|| LedgerError::NotFound(format!("budget named {name}")))
    }
}

pub fn engine(
    users: Vec<User>,
    mappings: Vec<CategoryMapping>,
    ledger: Arc<MemoryLedger>,
) -> Engine<MemoryRules, Arc<MemoryLedger>> {
    Engine::builder()
        .rule_store(MemoryRules { users, mappings })
        .ledger(ledger)
        .build()
        .unwrap()
}

pub fn purple() -> Option<FlagColor> {
    Some(FlagColor::Purple)
}
