//! Scheduling: one schedule per user, holding the events they attend.

use async_trait::async_trait;
use concord_engine::Concept;
use concord_foundation::{Id, Record, record};
use tracing::{debug, warn};

use super::{Store, id_field, missing, unknown_action};

/// `Scheduling.createSchedule { user } -> { schedule }`
pub const CREATE_SCHEDULE: &str = "Scheduling.createSchedule";
/// `Scheduling.scheduleEvent { user, event } -> {}`
pub const SCHEDULE_EVENT: &str = "Scheduling.scheduleEvent";
/// `Scheduling.unscheduleEvent { user, event } -> {}`
pub const UNSCHEDULE_EVENT: &str = "Scheduling.unscheduleEvent";
/// `Scheduling._getUserSchedule { user } -> [{ event }]`
pub const GET_USER_SCHEDULE: &str = "Scheduling._getUserSchedule";

#[derive(Clone, Debug)]
struct Schedule {
    id: Id,
    events: im::Vector<Id>,
}

/// User schedules.
#[derive(Debug, Default)]
pub struct Scheduling {
    schedules: Store<im::HashMap<Id, Schedule>>,
}

impl Scheduling {
    /// Creates an empty concept.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn create_schedule(&self, input: &Record) -> Record {
        let Some(user) = id_field(input, "user") else {
            return missing("user");
        };
        let mut schedules = self.schedules.write();
        if schedules.contains_key(&user) {
            return Record::from_error("Schedule already exists for this user");
        }
        let id = Id::generate();
        schedules.insert(
            user.clone(),
            Schedule {
                id: id.clone(),
                events: im::Vector::new(),
            },
        );
        debug!(user = %user, schedule = %id, "schedule created");
        record! { schedule: id }
    }

    fn change_event(&self, input: &Record, add: bool) -> Record {
        let Some(user) = id_field(input, "user") else {
            return missing("user");
        };
        let Some(event) = id_field(input, "event") else {
            return missing("event");
        };
        let mut schedules = self.schedules.write();
        let Some(schedule) = schedules.get_mut(&user) else {
            return Record::from_error("No schedule for this user");
        };

        let present = schedule.events.contains(&event);
        match (add, present) {
            (true, true) => Record::from_error("Event already scheduled"),
            (false, false) => Record::from_error("Event not in schedule"),
            (true, false) => {
                schedule.events.push_back(event);
                Record::new()
            }
            (false, true) => {
                schedule.events.retain(|e| *e != event);
                Record::new()
            }
        }
    }

    fn user_schedule(&self, input: &Record) -> Vec<Record> {
        let Some(user) = id_field(input, "user") else {
            return Vec::new();
        };
        self.schedules
            .read()
            .get(&user)
            .map(|schedule| {
                schedule
                    .events
                    .iter()
                    .map(|event| record! { event: event })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the schedule id for a user, if one exists.
    #[must_use]
    pub fn schedule_of(&self, user: &Id) -> Option<Id> {
        self.schedules.read().get(user).map(|s| s.id.clone())
    }
}

#[async_trait]
impl Concept for Scheduling {
    fn name(&self) -> &'static str {
        "Scheduling"
    }

    fn actions(&self) -> &[&'static str] {
        &["createSchedule", "scheduleEvent", "unscheduleEvent"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_getUserSchedule"]
    }

    async fn perform(&self, action: &str, input: Record) -> Record {
        match action {
            "createSchedule" => self.create_schedule(&input),
            "scheduleEvent" => self.change_event(&input, true),
            "unscheduleEvent" => self.change_event(&input, false),
            _ => unknown_action(self.name(), action),
        }
    }

    async fn query(&self, query: &str, input: Record) -> Vec<Record> {
        if query == "_getUserSchedule" {
            self.user_schedule(&input)
        } else {
            warn!(concept = self.name(), query, "unknown query");
            Vec::new()
        }
    }
}
