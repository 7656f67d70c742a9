// Lifecycle engines
pub mod audit;
pub mod cascade;
pub mod references;
pub mod relance;
pub mod sequences;

// Document services
pub mod affaires;
pub mod attestations;
pub mod courriers;
pub mod offers;
pub mod opportunities;
pub mod reports;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::events::EventSender;

/// Bundle of all services wired over one connection pool and one event
/// sink. The binary and the test harness both build this.
#[derive(Clone)]
pub struct DossierServices {
    pub sequences: sequences::SequenceAllocator,
    pub audit: audit::AuditTrail,
    pub cascade: cascade::DocumentCascade,
    pub relance: relance::RelanceScheduler,
    pub opportunities: opportunities::OpportunityService,
    pub offers: offers::OfferService,
    pub affaires: affaires::AffaireService,
    pub reports: reports::ReportService,
    pub courriers: courriers::CourrierService,
    pub attestations: attestations::AttestationService,
}

impl DossierServices {
    pub fn build(db: Arc<DatabaseConnection>, events: EventSender) -> Self {
        let sequences = sequences::SequenceAllocator::new(db.clone());
        let audit = audit::AuditTrail::new(db.clone());
        let cascade = cascade::DocumentCascade::new(
            db.clone(),
            sequences.clone(),
            audit.clone(),
            events.clone(),
        );
        let offers = offers::OfferService::new(
            db.clone(),
            sequences.clone(),
            cascade.clone(),
            audit.clone(),
            events.clone(),
        );

        Self {
            opportunities: opportunities::OpportunityService::new(
                db.clone(),
                sequences.clone(),
                audit.clone(),
                events.clone(),
                offers.clone(),
            ),
            affaires: affaires::AffaireService::new(
                db.clone(),
                cascade.clone(),
                audit.clone(),
                events.clone(),
            ),
            reports: reports::ReportService::new(db.clone(), audit.clone(), events.clone()),
            courriers: courriers::CourrierService::new(
                db.clone(),
                sequences.clone(),
                audit.clone(),
                events.clone(),
            ),
            attestations: attestations::AttestationService::new(
                db.clone(),
                sequences.clone(),
                audit.clone(),
                events.clone(),
            ),
            relance: relance::RelanceScheduler::new(db, events),
            sequences,
            audit,
            cascade,
            offers,
        }
    }
}
