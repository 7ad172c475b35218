fn main() {
    video_vault::run();
}
