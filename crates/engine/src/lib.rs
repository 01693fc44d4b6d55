//! The Task & Campaign Funding State Engine.
//!
//! Components take an injected store implementing [`store::FundingStore`]:
//! [`pg::PgStore`] in production and [`memory::MemoryStore`] in tests and
//! local runs. [`FundingEngine`] wires them together over one store.

pub mod campaigns;
pub mod donations;
pub mod emitter;
pub mod inbox;
pub mod ledger;
pub mod memory;
pub mod pg;
pub mod store;
pub mod tasks;

use campaigns::CampaignService;
use donations::DonationRecorder;
use emitter::Emitter;
use inbox::Inbox;
use ledger::CampaignLedger;
use store::FundingStore;
use tasks::TaskEngine;

/// Every engine component, sharing one store.
#[derive(Clone)]
pub struct FundingEngine<S> {
    store: S,
    pub campaigns: CampaignService<S>,
    pub donations: DonationRecorder<S>,
    pub tasks: TaskEngine<S>,
    pub ledger: CampaignLedger<S>,
    pub emitter: Emitter<S>,
    pub inbox: Inbox<S>,
}

impl<S: FundingStore> FundingEngine<S> {
    pub fn new(store: S) -> Self {
        let emitter = Emitter::new(store.clone());
        let ledger = CampaignLedger::new(store.clone(), emitter.clone());
        Self {
            campaigns: CampaignService::new(store.clone(), emitter.clone()),
            donations: DonationRecorder::new(store.clone(), ledger.clone(), emitter.clone()),
            tasks: TaskEngine::new(store.clone(), emitter.clone()),
            inbox: Inbox::new(store.clone()),
            ledger,
            emitter,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
