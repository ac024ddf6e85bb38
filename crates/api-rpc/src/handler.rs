//! RPC Method Handlers
//!
//! Parses wire strings into domain enums and delegates to the schedule
//! service. No lifecycle rules live here.

use crate::error::to_rpc_error;
use crate::types::{
    CalendarRequest, ChecklistRequest, CompleteRequest, CreateRequest, GetRequest, ListRequest,
    ScheduleListResponse, StatusRequest, UpcomingRequest, UpdateRequest,
};
use jsonrpsee::types::ErrorObjectOwned;
use std::str::FromStr;
use std::sync::Arc;
use upkeep_core::application::{
    CompletionStats, CreateScheduleRequest, ScheduleService, ScheduleUpdate,
};
use upkeep_core::domain::{DomainError, MaintenanceSchedule};
use upkeep_core::error::AppError;
use upkeep_core::port::{ScheduleFilter, SortOrder};

type RpcResult<T> = Result<T, ErrorObjectOwned>;

fn parse_enum<T>(value: &str) -> RpcResult<T>
where
    T: FromStr<Err = DomainError>,
{
    value
        .parse()
        .map_err(|e: DomainError| to_rpc_error(AppError::Domain(e)))
}

fn parse_opt<T>(value: Option<String>) -> RpcResult<Option<T>>
where
    T: FromStr<Err = DomainError>,
{
    value.as_deref().map(parse_enum).transpose()
}

fn parse_order(value: Option<&str>) -> RpcResult<SortOrder> {
    match value {
        None | Some("asc") => Ok(SortOrder::Ascending),
        Some("desc") => Ok(SortOrder::Descending),
        Some(other) => Err(to_rpc_error(AppError::Validation(format!(
            "order must be \"asc\" or \"desc\", got {:?}",
            other
        )))),
    }
}

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    service: Arc<ScheduleService>,
    default_horizon_days: u32,
}

impl RpcHandler {
    pub fn new(service: Arc<ScheduleService>, default_horizon_days: u32) -> Self {
        Self {
            service,
            default_horizon_days,
        }
    }

    /// maintenance.create.v1
    pub async fn create(&self, params: CreateRequest) -> RpcResult<MaintenanceSchedule> {
        let req = CreateScheduleRequest {
            machine: params.machine,
            title: params.title,
            description: params.description,
            schedule_type: parse_opt(params.schedule_type)?,
            frequency: parse_enum(&params.frequency)?,
            scheduled_date: params.scheduled_date,
            estimated_duration: params.estimated_duration,
            assigned_to: params.assigned_to,
            priority: parse_opt(params.priority)?,
            checklist: params.checklist,
            notes: params.notes,
            parts_used: params.parts_used,
        };

        self.service.create(req).await.map_err(to_rpc_error)
    }

    /// maintenance.get.v1
    pub async fn get(&self, params: GetRequest) -> RpcResult<MaintenanceSchedule> {
        self.service.get(&params.id).await.map_err(to_rpc_error)
    }

    /// maintenance.list.v1
    pub async fn list(&self, params: ListRequest) -> RpcResult<ScheduleListResponse> {
        let filter = ScheduleFilter {
            status: parse_opt(params.status)?,
            machine: params.machine,
            assigned_to: params.assigned_to,
            scheduled_from: params.from,
            scheduled_to: params.to,
            scheduled_before: None,
            order: parse_order(params.order.as_deref())?,
        };

        let rows = self.service.list(filter).await.map_err(to_rpc_error)?;
        Ok(rows.into())
    }

    /// maintenance.update.v1
    pub async fn update(&self, params: UpdateRequest) -> RpcResult<MaintenanceSchedule> {
        let changes = ScheduleUpdate {
            machine: params.machine,
            title: params.title,
            description: params.description,
            schedule_type: parse_opt(params.schedule_type)?,
            frequency: parse_opt(params.frequency)?,
            scheduled_date: params.scheduled_date,
            estimated_duration: params.estimated_duration,
            assigned_to: params.assigned_to,
            priority: parse_opt(params.priority)?,
            notes: params.notes,
            parts_used: params.parts_used,
            reminder_sent: params.reminder_sent,
            actual_start_time: params.actual_start_time,
            expected_version: params.expected_version,
        };

        self.service
            .update(&params.id, changes)
            .await
            .map_err(to_rpc_error)
    }

    /// maintenance.status.v1
    pub async fn set_status(&self, params: StatusRequest) -> RpcResult<MaintenanceSchedule> {
        let status = parse_enum(&params.status)?;
        self.service
            .set_status(&params.id, status, params.expected_version)
            .await
            .map_err(to_rpc_error)
    }

    /// maintenance.complete.v1
    pub async fn complete(&self, params: CompleteRequest) -> RpcResult<MaintenanceSchedule> {
        self.service
            .complete(&params.id, &params.completed_by, params.expected_version)
            .await
            .map_err(to_rpc_error)
    }

    /// maintenance.checklist.v1
    pub async fn update_checklist_item(
        &self,
        params: ChecklistRequest,
    ) -> RpcResult<MaintenanceSchedule> {
        self.service
            .update_checklist_item(
                &params.id,
                params.index,
                params.completed,
                params.notes,
                params.expected_version,
            )
            .await
            .map_err(to_rpc_error)
    }

    /// maintenance.overdue.v1
    pub async fn overdue(&self) -> RpcResult<ScheduleListResponse> {
        let rows = self.service.find_overdue().await.map_err(to_rpc_error)?;
        Ok(rows.into())
    }

    /// maintenance.upcoming.v1
    pub async fn upcoming(&self, params: UpcomingRequest) -> RpcResult<ScheduleListResponse> {
        let horizon = params.horizon_days.unwrap_or(self.default_horizon_days);
        let rows = self
            .service
            .find_upcoming(horizon)
            .await
            .map_err(to_rpc_error)?;
        Ok(rows.into())
    }

    /// maintenance.calendar.v1
    pub async fn calendar(&self, params: CalendarRequest) -> RpcResult<ScheduleListResponse> {
        let rows = self
            .service
            .calendar(params.year, params.month)
            .await
            .map_err(to_rpc_error)?;
        Ok(rows.into())
    }

    /// analytics.completion_rate.v1
    pub async fn completion_rate(&self) -> RpcResult<CompletionStats> {
        self.service.completion_stats().await.map_err(to_rpc_error)
    }
}
