pub mod digitransit;
