//! Conversion of repository options into MongoDB driver options.

use bson::doc;
use mongodb::{
    IndexModel,
    options::{FindOneOptions, FindOptions as MongoFindOptions, IndexOptions},
};

use pharmagob_core::query::{FindOptions, IndexSpec, Projection, Sort};

pub(crate) fn find_options(options: &FindOptions) -> MongoFindOptions {
    let mut converted = MongoFindOptions::default();

    converted.sort = options.sort_document();
    converted.projection = options.projection.as_ref().map(Projection::to_document);
    converted.skip = options.skip;
    converted.limit = options.limit;

    converted
}

pub(crate) fn find_one_options(sort: &[Sort], projection: Option<&Projection>) -> FindOneOptions {
    let mut converted = FindOneOptions::default();

    if !sort.is_empty() {
        converted.sort = Some(Sort::to_document(sort));
    }
    converted.projection = projection.map(Projection::to_document);

    converted
}

pub(crate) fn index_model(index: &IndexSpec) -> IndexModel {
    IndexModel::builder()
        .keys(doc! { index.field.clone(): index.direction.as_i32() })
        .options(
            IndexOptions::builder()
                .unique(index.unique)
                .expire_after(index.expire_after)
                .build(),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharmagob_core::query::SortDirection;
    use std::time::Duration;

    #[test]
    fn find_options_carry_every_setting() {
        let options = FindOptions::builder()
            .sort("transition_timestamp", SortDirection::Desc)
            .projection(Some(Projection::fields(["status"])))
            .skip(20)
            .limit(10)
            .build();

        let converted = find_options(&options);

        assert_eq!(converted.sort, Some(doc! { "transition_timestamp": -1 }));
        assert_eq!(converted.projection, Some(doc! { "status": 1 }));
        assert_eq!(converted.skip, Some(20));
        assert_eq!(converted.limit, Some(10));
    }

    #[test]
    fn empty_sort_is_left_unset() {
        let converted = find_one_options(&[], None);

        assert!(converted.sort.is_none());
        assert!(converted.projection.is_none());
    }

    #[test]
    fn expiring_index_model() {
        let model = index_model(&IndexSpec::expiring("created_at", Duration::from_secs(86_400)));

        assert_eq!(model.keys, doc! { "created_at": 1 });
        let options = model.options.unwrap();
        assert_eq!(options.expire_after, Some(Duration::from_secs(86_400)));
        assert_eq!(options.unique, Some(false));
    }
}
