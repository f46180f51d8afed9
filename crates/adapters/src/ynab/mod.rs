//! [`Ledger`] backed by the YNAB REST API.

mod model;

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::NaiveDate;
use engine::{
    Ledger, LedgerError, Transaction, TransactionDraft, TransactionPatch, WriteReceipt,
    closest_name, same_name,
};
use reqwest::{Client, Method};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::client::{ApiClient, ApiError};
use model::{
    AccountsData, BudgetsData, CategoriesData, Envelope, NewSubTransaction, NewTransaction,
    NewTransactionBody, PatchTransaction, PatchTransactionsBody, SaveTransactionsData,
    TransactionData, TransactionDetail, TransactionsData,
};

pub const DEFAULT_BASE_URL: &str = "https://api.ynab.com/v1";

/// Transactions requested per page.
const PAGE_SIZE: usize = 200;

/// How long account and category ids of a budget are reused.
const LOOKUP_TTL: Duration = Duration::from_secs(300);

/// Account and category name -> id tables of one budget.
#[derive(Debug)]
struct BudgetLookup {
    fetched_at: Instant,
    accounts: Vec<(String, String)>,
    categories: Vec<(String, String)>,
}

impl BudgetLookup {
    fn account_id(&self, name: &str) -> Option<&str> {
        find_id(&self.accounts, name)
    }

    fn category_id(&self, name: &str) -> Option<&str> {
        find_id(&self.categories, name)
    }
}

/// Transactions of one budget that carry an import id, kept current with
/// delta reads.
#[derive(Debug, Default)]
struct MarkerIndex {
    server_knowledge: Option<i64>,
    by_import_id: HashMap<String, TransactionDetail>,
}

impl MarkerIndex {
    fn merge(&mut self, details: Vec<TransactionDetail>) {
        for detail in details {
            if let Some(import_id) = detail.import_id.clone() {
                self.by_import_id.insert(import_id, detail);
            }
        }
    }
}

/// Exact normalized match first, then the closest name.
fn find_id<'a>(table: &'a [(String, String)], name: &str) -> Option<&'a str> {
    if let Some((_, id)) = table.iter().find(|(candidate, _)| same_name(candidate, name)) {
        return Some(id.as_str());
    }
    let names: Vec<&str> = table.iter().map(|(candidate, _)| candidate.as_str()).collect();
    closest_name(name, &names).map(|index| table[index].1.as_str())
}

pub struct YnabLedger {
    api: ApiClient,
    token: String,
    lookup_ttl: Duration,
    lookups: Mutex<HashMap<String, Arc<BudgetLookup>>>,
    markers: Mutex<HashMap<String, MarkerIndex>>,
}

impl YnabLedger {
    pub fn new(client: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api: ApiClient::new(client, base_url),
            token: token.into(),
            lookup_ttl: LOOKUP_TTL,
            lookups: Mutex::new(HashMap::new()),
            markers: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn lookup_ttl(mut self, ttl: Duration) -> Self {
        self.lookup_ttl = ttl;
        self
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.api.url(segments)?;
        let envelope: Envelope<T> = self.api.get_json(&self.token, url, query).await?;
        Ok(envelope.data)
    }

    /// All pages of a budget's transactions, deleted ones included, and the
    /// server knowledge they were read at.
    ///
    /// With `knowledge` only the transactions changed since then are
    /// returned. Paging stops on a short page or when the server starts
    /// repeating itself (it ignores `page` on some plans).
    async fn fetch_transactions(
        &self,
        budget_id: &str,
        since: Option<NaiveDate>,
        knowledge: Option<i64>,
    ) -> Result<(Vec<TransactionDetail>, Option<i64>), ApiError> {
        let mut all = Vec::new();
        let mut first_ids: Vec<String> = Vec::new();
        let mut server_knowledge = None;
        let mut page = 1_usize;
        loop {
            let mut query = vec![("page", page.to_string())];
            if let Some(since) = since {
                query.push(("since_date", since.to_string()));
            }
            if let Some(knowledge) = knowledge {
                query.push(("last_knowledge_of_server", knowledge.to_string()));
            }
            let data: TransactionsData = self
                .get(&["budgets", budget_id, "transactions"], &query)
                .await?;
            server_knowledge = data.server_knowledge.or(server_knowledge);
            let count = data.transactions.len();
            let Some(first) = data.transactions.first() else {
                break;
            };
            if first_ids.contains(&first.id) {
                debug!("page {page} of {budget_id} repeats an earlier page");
                break;
            }
            first_ids.push(first.id.clone());
            all.extend(data.transactions);
            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        debug!("fetched {} transactions of {budget_id}", all.len());
        Ok((all, server_knowledge))
    }

    async fn lookup(&self, budget_id: &str) -> Result<Arc<BudgetLookup>, ApiError> {
        let mut lookups = self.lookups.lock().await;
        if let Some(lookup) = lookups.get(budget_id)
            && lookup.fetched_at.elapsed() < self.lookup_ttl
        {
            return Ok(lookup.clone());
        }

        let accounts: AccountsData = self.get(&["budgets", budget_id, "accounts"], &[]).await?;
        let categories: CategoriesData =
            self.get(&["budgets", budget_id, "categories"], &[]).await?;
        let lookup = Arc::new(BudgetLookup {
            fetched_at: Instant::now(),
            accounts: accounts
                .accounts
                .into_iter()
                .filter(|account| !account.deleted && !account.closed)
                .map(|account| (account.name, account.id))
                .collect(),
            categories: categories
                .category_groups
                .into_iter()
                .filter(|group| !group.deleted)
                .flat_map(|group| group.categories)
                .filter(|category| !category.deleted)
                .map(|category| (category.name, category.id))
                .collect(),
        });
        lookups.insert(budget_id.to_string(), lookup.clone());
        Ok(lookup)
    }

    fn category_id(
        lookup: &BudgetLookup,
        budget_id: &str,
        category: Option<&str>,
    ) -> Result<Option<String>, LedgerError> {
        let Some(category) = category else {
            return Ok(None);
        };
        match lookup.category_id(category) {
            Some(id) => Ok(Some(id.to_string())),
            None => Err(LedgerError::Rejected(format!(
                "no category \"{category}\" in budget {budget_id}"
            ))),
        }
    }
}

impl Ledger for YnabLedger {
    async fn get_transactions(
        &self,
        budget_id: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let (details, _) = self.fetch_transactions(budget_id, since, None).await?;
        Ok(details
            .into_iter()
            .filter(|detail| since.is_none_or(|since| detail.date >= since))
            .map(|detail| detail.normalize(budget_id))
            .collect())
    }

    async fn get_transaction(
        &self,
        budget_id: &str,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, LedgerError> {
        let result: Result<TransactionData, ApiError> = self
            .get(&["budgets", budget_id, "transactions", transaction_id], &[])
            .await;
        match result {
            Ok(data) => Ok(Some(data.transaction.normalize(budget_id))),
            Err(err) if err.status().is_some_and(|status| status.as_u16() == 404) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn create_transaction(
        &self,
        budget_id: &str,
        draft: &TransactionDraft,
    ) -> Result<WriteReceipt, LedgerError> {
        let lookup = self.lookup(budget_id).await?;
        let account_id = lookup.account_id(&draft.account_name).ok_or_else(|| {
            LedgerError::Rejected(format!(
                "no account \"{}\" in budget {budget_id}",
                draft.account_name
            ))
        })?;
        let category_id = Self::category_id(&lookup, budget_id, draft.category.as_deref())?;
        let line_categories = draft
            .subtransactions
            .iter()
            .map(|line| Self::category_id(&lookup, budget_id, line.category.as_deref()))
            .collect::<Result<Vec<_>, _>>()?;

        let body = NewTransactionBody {
            transaction: NewTransaction {
                account_id,
                date: draft.date,
                amount: draft.amount.value(),
                payee_name: &draft.payee,
                category_id: category_id.as_deref(),
                memo: draft.memo.as_deref(),
                cleared: draft.cleared,
                approved: draft.approved,
                flag_color: draft.flag,
                import_id: &draft.import_id,
                subtransactions: draft
                    .subtransactions
                    .iter()
                    .zip(&line_categories)
                    .map(|(line, category_id)| NewSubTransaction {
                        amount: line.amount.value(),
                        category_id: category_id.as_deref(),
                        memo: line.memo.as_deref(),
                    })
                    .collect(),
            },
        };
        let url = self.api.url(&["budgets", budget_id, "transactions"])?;
        let raw: serde_json::Value = self
            .api
            .send_json(Method::POST, &self.token, url, &body)
            .await?;
        let saved: SaveTransactionsData = serde_json::from_value(raw["data"].clone())
            .map_err(|err| LedgerError::Transport(format!("unexpected create response: {err}")))?;

        if !saved.duplicate_import_ids.is_empty() {
            warn!("{budget_id} already holds import id {}", draft.import_id);
            return Err(LedgerError::Rejected(format!(
                "duplicate import id {}",
                draft.import_id
            )));
        }
        let transaction_id = raw["data"]["transaction"]["id"]
            .as_str()
            .map(str::to_string)
            .or_else(|| saved.transaction_ids.first().cloned())
            .ok_or_else(|| LedgerError::Transport("create response has no transaction id".into()))?;

        Ok(WriteReceipt { transaction_id, raw })
    }

    async fn update_transaction(
        &self,
        budget_id: &str,
        transaction_id: &str,
        patch: &TransactionPatch,
    ) -> Result<WriteReceipt, LedgerError> {
        let category_id = match patch.category.as_deref() {
            Some(category) => {
                let lookup = self.lookup(budget_id).await?;
                Self::category_id(&lookup, budget_id, Some(category))?
            }
            None => None,
        };

        let body = PatchTransactionsBody {
            transactions: vec![PatchTransaction {
                id: transaction_id,
                amount: patch.amount.map(|amount| amount.value()),
                category_id: category_id.as_deref(),
                flag_color: patch.flag,
            }],
        };
        let url = self.api.url(&["budgets", budget_id, "transactions"])?;
        let raw: serde_json::Value = self
            .api
            .send_json(Method::PATCH, &self.token, url, &body)
            .await?;

        Ok(WriteReceipt {
            transaction_id: transaction_id.to_string(),
            raw,
        })
    }

    /// The first lookup in a budget reads its whole history; later ones only
    /// read what changed since, deleted transactions included.
    async fn find_by_marker(
        &self,
        budget_id: &str,
        marker: &str,
    ) -> Result<Option<Transaction>, LedgerError> {
        let mut markers = self.markers.lock().await;
        let index = markers.entry(budget_id.to_string()).or_default();
        let knowledge = index.server_knowledge;
        let (details, server_knowledge) =
            self.fetch_transactions(budget_id, None, knowledge).await?;
        if knowledge.is_none() {
            index.by_import_id.clear();
        }
        debug!(
            "{budget_id}: {} transactions changed since knowledge {knowledge:?}",
            details.len()
        );
        index.merge(details);
        index.server_knowledge = server_knowledge;

        Ok(index
            .by_import_id
            .get(marker)
            .cloned()
            .map(|detail| detail.normalize(budget_id)))
    }

    async fn find_budget_id(&self, name: &str) -> Result<String, LedgerError> {
        let data: BudgetsData = self.get(&["budgets"], &[]).await?;
        if data.budgets.is_empty() {
            return Err(LedgerError::NotFound("no budgets visible to this token".into()));
        }
        let names: Vec<&str> = data.budgets.iter().map(|budget| budget.name.as_str()).collect();
        match closest_name(name, &names) {
            Some(index) => Ok(data.budgets[index].id.clone()),
            None => Err(LedgerError::NotFound(format!("no budget matching \"{name}\""))),
        }
    }
}
