mod assembly;
mod crs;
mod io;
mod space;
mod timer;
