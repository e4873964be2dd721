pub mod lookup_table_funclib;
