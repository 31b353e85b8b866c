pub mod form_or_json;
