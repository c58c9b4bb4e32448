pub mod clinic_dbprovider;
pub mod clinic_dbtype;
pub mod clinic_mem;
pub mod clinic_meta;
pub mod clinic_pg;
