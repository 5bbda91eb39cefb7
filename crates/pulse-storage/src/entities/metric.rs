use pulse_common::{Metric, MetricDto, MetricValue};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

use crate::error::StorageError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "metrics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub metric_type: String,
    pub delta: Option<i64>,
    pub gauge: Option<f64>,
    pub hash: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Metric {
    type Error = StorageError;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let id = m.id.clone();
        MetricDto {
            id: m.id,
            kind: m.metric_type,
            delta: m.delta,
            value: m.gauge,
            hash: m.hash,
        }
        .validate()
        .map_err(|source| StorageError::InvalidRow { id, source })
    }
}

impl From<&Metric> for ActiveModel {
    fn from(metric: &Metric) -> Self {
        let (delta, gauge) = match metric.value {
            MetricValue::Gauge(v) => (None, Some(v)),
            MetricValue::Counter(d) => (Some(d), None),
        };
        ActiveModel {
            id: Set(metric.id.clone()),
            metric_type: Set(metric.kind().to_string()),
            delta: Set(delta),
            gauge: Set(gauge),
            hash: Set(metric.hash.clone()),
        }
    }
}
