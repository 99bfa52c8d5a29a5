use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::RoleEnum;
use crate::repositories::FeeTotals;

#[derive(Debug, Default, Serialize, ToSchema, PartialEq, Eq)]
pub struct RoleCounts {
    pub principal: i64,
    pub hod: i64,
    pub faculty: i64,
    pub student: i64,
}

impl RoleCounts {
    pub fn from_rows(rows: Vec<(RoleEnum, i64)>) -> Self {
        let mut counts = Self::default();
        for (role, count) in rows {
            match role {
                RoleEnum::Principal => counts.principal += count,
                RoleEnum::Hod => counts.hod += count,
                RoleEnum::Faculty => counts.faculty += count,
                RoleEnum::Student => counts.student += count,
            }
        }
        counts
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeeSummary {
    pub count: u64,
    #[schema(value_type = String)]
    pub billed: Decimal,
    #[schema(value_type = String)]
    pub collected: Decimal,
    #[schema(value_type = String)]
    pub outstanding: Decimal,
}

impl From<FeeTotals> for FeeSummary {
    fn from(totals: FeeTotals) -> Self {
        Self {
            count: totals.count,
            billed: totals.billed,
            collected: totals.collected,
            outstanding: totals.billed - totals.collected,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminStatsResponse {
    pub users: RoleCounts,
    pub departments: u64,
    pub batches: u64,
    pub subjects: u64,
    pub pending_complaints: u64,
    pub fees: FeeSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HodStatsResponse {
    pub department_id: Uuid,
    pub users: RoleCounts,
    pub batches: u64,
    pub subjects: u64,
    pub pending_complaints: u64,
    pub fees: FeeSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_counts_fill_missing_roles_with_zero() {
        let counts = RoleCounts::from_rows(vec![(RoleEnum::Student, 120), (RoleEnum::Faculty, 9)]);
        assert_eq!(
            counts,
            RoleCounts {
                principal: 0,
                hod: 0,
                faculty: 9,
                student: 120,
            }
        );
    }

    #[test]
    fn test_outstanding_is_billed_minus_collected() {
        let summary = FeeSummary::from(FeeTotals {
            count: 3,
            billed: Decimal::from(3000),
            collected: Decimal::from(1400),
        });
        assert_eq!(summary.outstanding, Decimal::from(1600));
    }
}
